use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::thread;

use solo::registry;

struct GameSettings {
    width: AtomicU32,
    height: AtomicU32,
    brightness: AtomicU32,
}

impl GameSettings {
    fn new() -> Self {
        println!("settings constructed (you should see this once)");
        Self {
            width: AtomicU32::new(786),
            height: AtomicU32::new(1200),
            brightness: AtomicU32::new(75),
        }
    }

    fn set_width(&self, width: u32) {
        self.width.store(width, Ordering::Relaxed);
    }

    fn set_brightness(&self, brightness: u32) {
        self.brightness.store(brightness, Ordering::Relaxed);
    }

    fn display(&self) {
        println!("Brightness: {}", self.brightness.load(Ordering::Relaxed));
        println!("Height: {}", self.height.load(Ordering::Relaxed));
        println!("Width: {}", self.width.load(Ordering::Relaxed));
    }
}

fn main() {
    let registry = Arc::new(registry! {
        provide(GameSettings => |_r| GameSettings::new())
    });

    let settings = registry.get::<GameSettings>();
    settings.display();

    settings.set_brightness(400);
    settings.set_width(500);

    // A second handle resolved on another thread observes the mutations:
    // the instance is shared, not copied.
    let handle = {
        let registry = registry.clone();
        thread::spawn(move || registry.get::<GameSettings>().display())
    };
    handle.join().unwrap();
}
