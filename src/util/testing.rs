//! Shared test setup and fixture trees.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, Once};

use tracing::{debug, info};

use crate::infrastructure::traits::FileSystem;
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

static TEST_SETUP: Once = Once::new();

/// Three talents in a row, unlocking at 0, 1 and 2 spent points.
pub const CHAIN_TREE: &str = "custom:chain:three in a row::0:0;\
0:A::0:0:0:0:1:0:0::1;\
1:B::0:1:0:0:1:1:0:0:2;\
2:C::0:2:0:0:1:2:0:1:;";

/// A two-point root feeding a passive and a switch talent which both lead
/// to a three-point finisher. Expands to seven positions.
pub const MIXED_TREE: &str = "custom:mixed:demo tree:loadout:0:0;\
0:Root:first rank,second rank:0:0:1:0:2:0:0::1,2;\
1:Focus::1:1:0:0:1:0:0:0:3;\
2:Stance,Other stance::2:1:2:0:1:2:0:0:3;\
3:Finisher::0:2:1:0:3:3:0:1,2:;";

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "trace");
        }
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    // the rayon pool is noisy at trace level
    let noisy_modules = ["rayon", "rayon_core"];
    let module_filter = filter_fn(move |metadata| {
        !noisy_modules
            .iter()
            .any(|name| metadata.target().starts_with(name))
    });

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_test_writer()
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_filter(module_filter)
            .with_filter(env_filter),
    );

    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else if let Err(e) = subscriber.try_init() {
        eprintln!("Error: Failed to set up logging: {}", e);
    }
}

/// Write `lines` to `dir/name`, one per line.
pub fn write_lines(dir: &Path, name: &str, lines: &[&str]) -> io::Result<PathBuf> {
    let path = dir.join(name);
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(&path, content)?;
    Ok(path)
}

/// Files kept in memory; directories exist implicitly.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<BTreeMap<PathBuf, String>>,
}

impl MemoryFileSystem {
    pub fn with_lines(path: impl Into<PathBuf>, lines: &[&str]) -> Self {
        let fs = Self::default();
        fs.files().insert(path.into(), lines.join("\n"));
        fs
    }

    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files().get(path).cloned()
    }

    fn files(&self) -> MutexGuard<'_, BTreeMap<PathBuf, String>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.contents(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        self.files().insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.files().contains_key(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.exists(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_tree;

    #[test]
    fn given_fixture_trees_when_parsing_then_both_are_valid() {
        init_test_setup();
        let chain = parse_tree(CHAIN_TREE).unwrap();
        let mixed = parse_tree(MIXED_TREE).unwrap();
        assert_eq!(chain.node_count(), 3);
        assert_eq!(mixed.node_count(), 4);
        assert_eq!(mixed.max_talent_points(), 7);
    }
}
