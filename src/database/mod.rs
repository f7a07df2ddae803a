use mongodb::{Client, Collection, Database};
use std::error::Error;

pub const POLLS_COLLECTION: &str = "polls";
pub const USERS_COLLECTION: &str = "users";

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str) -> Result<Self, Box<dyn Error>> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        client_options.max_pool_size = Some(20);
        client_options.min_pool_size = Some(5);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = uri
            .split('/')
            .last()
            .and_then(|s| s.split('?').next())
            .filter(|s| !s.is_empty())
            .unwrap_or("campus_poll");

        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };

        mongodb.ensure_indexes().await?;

        Ok(mongodb)
    }

    /// Creates the indexes the poll lifecycle relies on. The unique indexes
    /// on the public tokens are what makes token collisions impossible
    /// rather than merely improbable.
    async fn ensure_indexes(&self) -> Result<(), Box<dyn Error>> {
        use mongodb::bson::doc;
        use mongodb::options::IndexOptions;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let polls = self.db.collection::<mongodb::bson::Document>(POLLS_COLLECTION);

        let vote_id_index = IndexModel::builder()
            .keys(doc! { "vote_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match polls.create_index(vote_id_index).await {
            Ok(_) => log::info!("   ✅ Index created: polls(vote_id) unique"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let results_id_index = IndexModel::builder()
            .keys(doc! { "results_id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match polls.create_index(results_id_index).await {
            Ok(_) => log::info!("   ✅ Index created: polls(results_id) unique"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        // Index for listing a user's polls
        let creator_index = IndexModel::builder()
            .keys(doc! { "creator_id": 1 })
            .build();

        match polls.create_index(creator_index).await {
            Ok(_) => log::info!("   ✅ Index created: polls(creator_id)"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        let users = self.db.collection::<mongodb::bson::Document>(USERS_COLLECTION);

        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();

        match users.create_index(email_index).await {
            Ok(_) => log::info!("   ✅ Index created: users(email) unique"),
            Err(e) => log::debug!("   ℹ️  Index already exists: {}", e),
        }

        log::info!("✅ Database indexes ready");

        Ok(())
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }
}
