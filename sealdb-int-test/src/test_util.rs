use sealdb::collection::{Collection, Document};
use sealdb::database::Database;
use sealdb::doc;
use sealdb::errors::SealResult;
use sealdb::store::MemoryStorage;
use std::backtrace::Backtrace;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Runs a test with retry logic and error handling.
/// `after` runs whether the test body failed or not.
pub fn run_test<T, B, A>(before: B, test: T, after: A)
where
    T: Fn(TestContext) -> SealResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    B: Fn() -> SealResult<TestContext> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
    A: Fn(TestContext) -> SealResult<()> + std::panic::UnwindSafe + std::panic::RefUnwindSafe,
{
    const MAX_RETRIES: u32 = 3;
    let mut last_error: Option<String> = None;
    let mut last_backtrace: Option<String> = None;

    for attempt in 1..=MAX_RETRIES {
        let start_time = Instant::now();

        let result = std::panic::catch_unwind(|| {
            let backtrace = Backtrace::capture();
            match before() {
                Ok(ctx) => match test(ctx.clone()) {
                    Ok(_) => after(ctx)
                        .map_err(|e| (format!("After run failed: {:?}", e), backtrace.to_string())),
                    Err(e) => {
                        let _ = after(ctx);
                        Err((format!("Test failed: {:?}", e), backtrace.to_string()))
                    }
                },
                Err(e) => Err((format!("Before run failed: {:?}", e), backtrace.to_string())),
            }
        });

        let elapsed = start_time.elapsed();

        match result {
            Ok(Ok(_)) => return,
            Ok(Err((e, bt))) => {
                last_error = Some(e.clone());
                last_backtrace = Some(bt);
                if attempt < MAX_RETRIES {
                    eprintln!(
                        "\n========== Test Attempt {}/{} Failed (took {:?}) ==========",
                        attempt, MAX_RETRIES, elapsed
                    );
                    eprintln!("Error: {}", e);
                    thread::sleep(Duration::from_millis(100 * attempt as u64));
                }
            }
            Err(panic_err) => {
                let err_msg = if let Some(s) = panic_err.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic_err.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                eprintln!(
                    "\n========== Test Attempt {}/{} Panicked (took {:?}) ==========",
                    attempt, MAX_RETRIES, elapsed
                );
                eprintln!("Panic: {}", err_msg);
                last_error = Some(format!("Panic: {}", err_msg));
                last_backtrace = Some(Backtrace::capture().to_string());
                if attempt < MAX_RETRIES {
                    thread::sleep(Duration::from_millis(100 * attempt as u64));
                }
            }
        }
    }

    eprintln!("\n==================== TEST FAILED ====================");
    eprintln!("Failed after {} attempts", MAX_RETRIES);
    eprintln!("Last error: {}", last_error.as_deref().unwrap_or("Unknown"));
    if let Some(bt) = &last_backtrace {
        if !bt.is_empty() && !bt.contains("disabled") {
            eprintln!("\nBacktrace:\n{}", bt);
        }
    }
    eprintln!("=====================================================\n");

    panic!(
        "Test failed after {} attempts. Last error: {}",
        MAX_RETRIES,
        last_error.unwrap_or_default()
    );
}

#[derive(Clone)]
pub struct TestContext {
    path: String,
    db: Database,
    dir: Option<Arc<TempDir>>,
    storage: Option<MemoryStorage>,
}

impl TestContext {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn db(&self) -> Database {
        self.db.clone()
    }

    /// In-memory storage of the context, if it was created with one.
    pub fn storage(&self) -> Option<&MemoryStorage> {
        self.storage.as_ref()
    }

    /// Opens a second database over the same storage, as a restarted
    /// process would.
    pub fn reopen(&self) -> SealResult<Database> {
        let builder = Database::builder().storage_dir(&self.path);
        match &self.storage {
            Some(storage) => builder.storage_backend(Arc::new(storage.clone())).open(),
            None => builder.open(),
        }
    }
}

/// A database writing its files into a fresh temporary directory.
pub fn create_test_context() -> SealResult<TestContext> {
    let dir = TempDir::new()?;
    let path = dir.path().to_string_lossy().into_owned();
    let db = Database::builder().storage_dir(&path).open()?;
    Ok(TestContext {
        path,
        db,
        dir: Some(Arc::new(dir)),
        storage: None,
    })
}

/// A database keeping its files in memory.
pub fn create_memory_test_context() -> SealResult<TestContext> {
    let storage = MemoryStorage::new();
    let path = "memory".to_string();
    let db = Database::builder()
        .storage_dir(&path)
        .storage_backend(Arc::new(storage.clone()))
        .open()?;
    Ok(TestContext {
        path,
        db,
        dir: None,
        storage: Some(storage),
    })
}

/// Closes the database and removes the temporary directory once the last
/// clone of the context is gone.
pub fn cleanup(ctx: TestContext) -> SealResult<()> {
    if let Err(e) = ctx.db().close() {
        eprintln!("Warning: Failed to close database: {:?}", e);
    }
    if let Some(dir) = ctx.dir {
        if let Ok(dir) = Arc::try_unwrap(dir) {
            dir.close()?;
        }
    }
    Ok(())
}

pub fn create_test_docs() -> Vec<Document> {
    vec![
        doc! {
            first_name: "fn1",
            last_name: "ln1",
            age: 32,
            address: { city: "Paris", zip: "75001" },
            tags: ["red", "blue"],
            score: 7.5,
        },
        doc! {
            first_name: "fn2",
            last_name: "ln2",
            age: 41,
            address: { city: "Lyon", zip: "69001" },
            tags: ["green"],
            score: 4,
        },
        doc! {
            first_name: "fn3",
            last_name: "ln2",
            age: 19,
            address: { city: "Paris", zip: "75011" },
            tags: [],
        },
    ]
}

pub fn insert_test_documents(collection: &Collection) -> SealResult<Vec<String>> {
    collection.save_many(create_test_docs())
}

/// Saves `{i: 0..count, s: "s<i % 4>"}`.
pub fn insert_numbered(collection: &Collection, count: i64) -> SealResult<()> {
    let documents = (0..count)
        .map(|i| doc! { i: i, s: (format!("s{}", i % 4)) })
        .collect();
    collection.save_many(documents)?;
    Ok(())
}

pub fn sorted_ids(documents: &[Document]) -> Vec<String> {
    let mut ids: Vec<String> = documents
        .iter()
        .filter_map(|d| d.id().map(str::to_string))
        .collect();
    ids.sort();
    ids
}
