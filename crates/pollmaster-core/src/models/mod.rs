//! Data models for PollMaster

mod record;
mod user;

pub use record::{
    Article, ArticleDraft, ArticlePatch, CollectionRecord, Pet, PetDraft, PetFood, PetFoodDraft,
    PetFoodPatch, PetPatch,
};
pub use user::{Role, User};
