//! LMS Seed - fills a MongoDB database with sample course data.
//!
//! This is the entry point for the `lms-seed` binary. Every subcommand drops
//! and rebuilds one collection; `all` runs them in dependency order.

mod generate;
mod seed;

use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lms_store::{MongoStore, Store};

use seed::Seeder;

/// LMS Seed - fills the database with sample data.
#[derive(Parser, Debug)]
#[command(name = "lms-seed")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// MongoDB connection string.
    #[arg(
        long,
        env = "MONGODB_URI",
        default_value = "mongodb://localhost:27017/?directConnection=true"
    )]
    uri: String,

    /// Database name.
    #[arg(long, env = "MONGODB_DATABASE", default_value = "lms")]
    database: String,

    /// Seed for the random generator; omit for a fresh data set each run.
    #[arg(long)]
    seed: Option<u64>,

    /// Enable debug logging.
    #[arg(long, default_value = "false")]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum Command {
    /// Replace all courses.
    Courses {
        /// Number of courses to generate.
        #[arg(long, default_value_t = 20)]
        count: usize,
    },
    /// Replace all lessons (needs courses).
    Lessons,
    /// Replace all enrollments (needs courses).
    Enrollments {
        /// Number of users to enroll.
        #[arg(long, default_value_t = 20)]
        count: usize,
    },
    /// Replace all orders (needs courses).
    Orders {
        /// Number of users placing orders.
        #[arg(long, default_value_t = 20)]
        count: usize,
    },
    /// Replace all progress entries (needs courses and enrollments).
    Progress,
    /// Run every step in dependency order.
    All {
        /// Number of courses to generate.
        #[arg(long, default_value_t = 20)]
        count: usize,
        /// Number of users for enrollments and orders.
        #[arg(long, default_value_t = 20)]
        users: usize,
    },
}

async fn run<S: Store>(seeder: &mut Seeder<'_, S, StdRng>, command: Command) -> seed::Result<()> {
    match command {
        Command::Courses { count } => {
            seeder.courses(count).await?;
        }
        Command::Lessons => {
            seeder.lessons().await?;
        }
        Command::Enrollments { count } => {
            seeder.enrollments(count).await?;
        }
        Command::Orders { count } => {
            seeder.orders(count).await?;
        }
        Command::Progress => {
            seeder.progress().await?;
        }
        Command::All { count, users } => {
            seeder.courses(count).await?;
            seeder.lessons().await?;
            seeder.enrollments(users).await?;
            seeder.orders(users).await?;
            seeder.progress().await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let default_filter = if args.debug {
        "debug"
    } else {
        "info,lms=debug"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(database = %args.database, command = ?args.command, "Seeding");

    let store = MongoStore::connect(&args.uri, &args.database).await?;
    store.ping().await?;
    tracing::info!("Connected to MongoDB");

    let rng = args
        .seed
        .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64);
    let mut seeder = Seeder::new(&store, rng, chrono::Utc::now());

    if let Err(e) = run(&mut seeder, args.command).await {
        tracing::error!(error = %e, "Seeding failed");
        return Err(e.into());
    }

    tracing::info!("Seeding finished");
    Ok(())
}
