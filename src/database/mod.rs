use mongodb::bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Client, Collection, Database, IndexModel};

use crate::store::{StoreError, StoreResult};

pub mod mongo_store;

pub const USERS: &str = "users";
pub const CLUBS: &str = "clubs";
pub const MEMBERSHIPS: &str = "memberships";
pub const POSTS: &str = "posts";
pub const COMMENTS: &str = "comments";

impl From<mongodb::error::Error> for StoreError {
    fn from(e: mongodb::error::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

#[derive(Clone)]
pub struct MongoDB {
    client: Client,
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> StoreResult<Self> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Database name is the last path segment of the URI
        let db_name = uri
            .split_once("://")
            .and_then(|(_, rest)| rest.split_once('/'))
            .and_then(|(_, path)| path.split('?').next())
            .filter(|name| !name.is_empty())
            .unwrap_or("campus_clubs");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { client, db };
        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes the store relies on. The unique ones are load-bearing:
    /// they make club lookup unambiguous and membership creation idempotent.
    async fn ensure_indexes(&self) -> StoreResult<()> {
        log::info!("🔧 Creating database indexes...");

        let clubs = self.collection::<Document>(CLUBS);
        let match_key_index = IndexModel::builder()
            .keys(doc! { "match_key": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(doc! { "match_key": { "$exists": true } })
                    .build(),
            )
            .build();
        clubs.create_index(match_key_index).await?;
        log::info!("   ✅ Index ready: clubs(match_key) unique");

        let memberships = self.collection::<Document>(MEMBERSHIPS);
        let pair_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "club_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        memberships.create_index(pair_index).await?;
        log::info!("   ✅ Index ready: memberships(user_id, club_id) unique");

        let posts = self.collection::<Document>(POSTS);
        let optional = [
            (
                posts.clone(),
                doc! { "is_public": 1, "is_pinned": -1, "created_at": -1, "_id": -1 },
                "posts(is_public, is_pinned, created_at)",
            ),
            (posts.clone(), doc! { "tags": 1 }, "posts(tags)"),
            (posts, doc! { "club_id": 1, "created_at": -1 }, "posts(club_id, created_at)"),
            (
                self.collection::<Document>(COMMENTS),
                doc! { "post_id": 1, "created_at": -1 },
                "comments(post_id, created_at)",
            ),
        ];

        for (collection, keys, label) in optional {
            let index = IndexModel::builder().keys(keys).build();
            match collection.create_index(index).await {
                Ok(_) => log::info!("   ✅ Index ready: {}", label),
                Err(e) => log::debug!("   ℹ️  Index {} not created: {}", label, e),
            }
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }
}
