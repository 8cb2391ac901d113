//! A connection whose constructor fails on the first attempt. The registry
//! reverts to uninitialized after the failure, so the retry constructs fresh;
//! exactly one instance ever becomes visible.

use std::sync::atomic::{AtomicUsize, Ordering};

use solo::registry;

static ATTEMPTS: AtomicUsize = AtomicUsize::new(0);

struct Connection {
    attempt: usize,
}

impl Connection {
    fn open() -> Result<Self, String> {
        let attempt = ATTEMPTS.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt == 1 {
            return Err("connection refused".to_string());
        }
        Ok(Self { attempt })
    }
}

fn main() {
    let registry = registry! {
        provide(try Connection => |_r| Connection::open())
    };

    match registry.try_get::<Connection>() {
        Ok(_) => unreachable!("first attempt is wired to fail"),
        Err(err) => println!("first attempt failed: {}", err),
    }

    let connection = registry.get::<Connection>();
    println!("connected on attempt {}", connection.attempt);

    // Later resolutions reuse the cached instance; the constructor does not
    // run again.
    let again = registry.get::<Connection>();
    println!(
        "still attempt {} after {} total constructor runs",
        again.attempt,
        ATTEMPTS.load(Ordering::SeqCst)
    );
}
