//! Basic example of the Wasl DI engine.

use std::sync::Arc;

use wasl::prelude::*;

// === Define your types ===

struct Config {
    region: &'static str,
}

struct Database {
    url: String,
}

impl Database {
    fn query(&self, sql: &str) -> String {
        format!("[{}] {sql}", self.url)
    }
}

/// One connection pool for the whole process.
struct Pool {
    id: u64,
}

impl Injectable for Pool {
    fn construct() -> Result<Self> {
        Ok(Pool {
            id: std::process::id() as u64,
        })
    }

    fn default_scope() -> Scope {
        Scope::Process
    }
}

/// Per-request state, cached for the duration of one unit of work.
struct RequestState {
    sequence: u64,
}

/// A service declaring its dependencies as lazy fields.
struct UserService {
    users_db: Attr<Database>,
    pool: Attr<Pool>,
}

impl Injectable for UserService {
    fn construct() -> Result<Self> {
        Ok(UserService {
            users_db: Attr::new("users_db").annotated("users"),
            pool: Attr::of("pool"),
        })
    }
}

impl UserService {
    fn find_user(&self, id: u64) -> Result<String> {
        let db = self.users_db.get()?;
        let pool = self.pool.get()?;
        Ok(format!(
            "pool#{}: {}",
            pool.id,
            db.query(&format!("SELECT * FROM users WHERE id = {id}"))
        ))
    }
}

fn handle_request(sequence: &mut u64) -> Result<()> {
    // One call context per unit of work; dropped on every exit path.
    let _ctx = CallContext::enter();

    let state_a: Arc<RequestState> = provide_bound()?;
    let state_b: Arc<RequestState> = provide_bound()?;
    println!(
        "  request state #{} (same instance within the request: {})",
        state_a.sequence,
        Arc::ptr_eq(&state_a, &state_b)
    );

    // Parameter-style injection, filled only because the caller passed None.
    let service = fill::<UserService>(None)?;
    println!("  {}", service.find_user(42)?);

    *sequence += 1;
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("wasl=debug")
        .init();

    let mut sequence = 0u64;

    let injector = Injector::builder()
        // A fixed configuration value: always the identical instance.
        .bind::<Config>()
        .to_instance(Config { region: "eu-west" })?
        // Two databases of the same type, told apart by annotation.
        .bind::<Database>()
        .annotated("users")
        .to_factory(|| {
            let config: Arc<Config> = provide_bound()?;
            Ok(Database {
                url: format!("postgres://{}/users", config.region),
            })
        })
        .bind::<Database>()
        .annotated("articles")
        .to_factory(|| {
            let config: Arc<Config> = provide_bound()?;
            Ok(Database {
                url: format!("postgres://{}/articles", config.region),
            })
        })
        // Fresh per unit of work.
        .bind::<RequestState>()
        .in_scope(Scope::CallContext)
        .to_factory(|| {
            use std::sync::atomic::{AtomicU64, Ordering};
            static SEQUENCE: AtomicU64 = AtomicU64::new(1);
            Ok(RequestState {
                sequence: SEQUENCE.fetch_add(1, Ordering::Relaxed),
            })
        })
        .build();

    register(Arc::new(injector));

    println!("request 1:");
    handle_request(&mut sequence)?;
    println!("request 2:");
    handle_request(&mut sequence)?;
    println!("handled {sequence} requests");

    unregister();
    Ok(())
}
