use std::sync::Arc;

use pollmaster_core::models::{
    ArticleDraft, ArticlePatch, PetDraft, PetFoodDraft, PetFoodPatch, PetPatch,
};
use pollmaster_core::{
    Article, CollectionBackend, CollectionRecord, CollectionStore, JsonFileStore, Pet, PetFood,
    SessionStore,
};

use crate::cli::{ArticleCommands, PetCommands, PetFoodCommands};
use crate::commands::common::{open_session, print_json, CliPaths};
use crate::config_profiles::BackendMode;
use crate::error::CliError;

/// One-line listing used by `list`.
pub trait ListLine {
    fn list_line(&self) -> String;
}

impl ListLine for Article {
    fn list_line(&self) -> String {
        format!("{}  {}  ({})\n    {}", self.id, self.title, self.date, self.excerpt())
    }
}

impl ListLine for PetFood {
    fn list_line(&self) -> String {
        format!("{}  {}  ${:.2}", self.id, self.name, self.price)
    }
}

impl ListLine for Pet {
    fn list_line(&self) -> String {
        format!("{}  {} the {}  ${:.2}", self.id, self.name, self.species, self.price)
    }
}

enum Action<T: CollectionRecord> {
    List { json: bool },
    Add(T::Draft),
    Update { id: String, patch: T::Patch },
    Delete { id: String },
}

pub async fn run_articles(
    command: ArticleCommands,
    paths: &CliPaths,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let action = match command {
        ArticleCommands::List { json } => Action::List { json },
        ArticleCommands::Add {
            title,
            summary,
            body,
            date,
        } => Action::Add(ArticleDraft {
            title,
            summary,
            body,
            date,
        }),
        ArticleCommands::Update {
            id,
            title,
            summary,
            body,
            date,
        } => {
            if title.is_none() && summary.is_none() && body.is_none() && date.is_none() {
                return Err(CliError::EmptyPatch);
            }
            Action::Update {
                id,
                patch: ArticlePatch {
                    title,
                    summary,
                    body,
                    date,
                },
            }
        }
        ArticleCommands::Delete { id } => Action::Delete { id },
    };
    run_collection::<Article>(action, paths, global_profile).await
}

pub async fn run_pet_foods(
    command: PetFoodCommands,
    paths: &CliPaths,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let action = match command {
        PetFoodCommands::List { json } => Action::List { json },
        PetFoodCommands::Add {
            name,
            price,
            description,
            image_path,
        } => Action::Add(PetFoodDraft {
            name,
            price,
            description,
            image_path,
        }),
        PetFoodCommands::Update {
            id,
            name,
            price,
            description,
            image_path,
        } => {
            if name.is_none() && price.is_none() && description.is_none() && image_path.is_none()
            {
                return Err(CliError::EmptyPatch);
            }
            Action::Update {
                id,
                patch: PetFoodPatch {
                    name,
                    price,
                    description,
                    image_path,
                },
            }
        }
        PetFoodCommands::Delete { id } => Action::Delete { id },
    };
    run_collection::<PetFood>(action, paths, global_profile).await
}

pub async fn run_pets(
    command: PetCommands,
    paths: &CliPaths,
    global_profile: Option<&str>,
) -> Result<(), CliError> {
    let action = match command {
        PetCommands::List { json } => Action::List { json },
        PetCommands::Add {
            name,
            species,
            price,
        } => Action::Add(PetDraft {
            name,
            species,
            price,
        }),
        PetCommands::Update {
            id,
            name,
            species,
            price,
        } => {
            if name.is_none() && species.is_none() && price.is_none() {
                return Err(CliError::EmptyPatch);
            }
            Action::Update {
                id,
                patch: PetPatch {
                    name,
                    species,
                    price,
                },
            }
        }
        PetCommands::Delete { id } => Action::Delete { id },
    };
    run_collection::<Pet>(action, paths, global_profile).await
}

pub fn backend_for<T: CollectionRecord>(mode: BackendMode) -> CollectionBackend {
    match mode {
        BackendMode::Remote => CollectionBackend::remote_for::<T>(),
        BackendMode::Local => CollectionBackend::Local,
    }
}

async fn run_collection<T>(
    action: Action<T>,
    paths: &CliPaths,
    global_profile: Option<&str>,
) -> Result<(), CliError>
where
    T: CollectionRecord + ListLine,
{
    let (resolved, session) = open_session(paths, global_profile).await?;
    let store = open_collection::<T>(&session, resolved.profile.backend())?;

    let (items, verb) = match action {
        Action::List { json } => {
            let items = match store.backend() {
                CollectionBackend::Remote { .. } => store.refresh().await?,
                CollectionBackend::Local => store.items()?,
            };
            if json {
                return print_json(&items);
            }
            (items, None)
        }
        Action::Add(draft) => (store.add_item(draft).await?, Some("Added")),
        Action::Update { id, patch } => (store.update_item(&id, patch).await?, Some("Updated")),
        Action::Delete { id } => (store.delete_item(&id).await?, Some("Deleted")),
    };

    if let Some(verb) = verb {
        println!("{verb} {} item; {} total", T::COLLECTION, items.len());
        return Ok(());
    }
    if items.is_empty() {
        println!("No {} yet.", T::COLLECTION);
    }
    for item in &items {
        println!("{}", item.list_line());
    }
    Ok(())
}

fn open_collection<T: CollectionRecord>(
    session: &Arc<SessionStore<JsonFileStore>>,
    mode: BackendMode,
) -> Result<CollectionStore<T, JsonFileStore>, CliError> {
    Ok(CollectionStore::new(
        Arc::clone(session),
        backend_for::<T>(mode),
    )?)
}
