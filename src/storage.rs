use std::collections::HashMap;
use std::fs::{DirBuilder, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::sketch::Sketch;
use crate::Error;

/// Somewhere encoded sketches can be kept, addressed by an opaque key.
pub trait Storage {
    /// Save bytes under `key`
    fn save(&self, key: &str, content: &[u8]) -> Result<String, Error>;

    /// Load the bytes saved under `key`
    fn load(&self, key: &str) -> Result<Vec<u8>, Error>;
}

impl<L> Storage for Mutex<L>
where
    L: ?Sized + Storage,
{
    fn save(&self, key: &str, content: &[u8]) -> Result<String, Error> {
        self.lock().map_err(poisoned)?.save(key, content)
    }

    fn load(&self, key: &str) -> Result<Vec<u8>, Error> {
        self.lock().map_err(poisoned)?.load(key)
    }
}

fn poisoned<T>(_: std::sync::PoisonError<T>) -> Error {
    Error::Internal {
        message: "storage lock poisoned".into(),
    }
}

fn check_key(key: &str) -> Result<(), Error> {
    if key.is_empty() {
        return Err(Error::InvalidParameter {
            name: "key".into(),
            message: "storage keys can't be empty".into(),
        });
    }
    Ok(())
}

/// Store files locally into a directory, one file per key.
#[derive(Debug, Clone)]
pub struct FSStorage {
    basepath: PathBuf,
}

impl FSStorage {
    pub fn new<P: AsRef<Path>>(location: P) -> FSStorage {
        FSStorage {
            basepath: location.as_ref().into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.basepath
    }
}

impl Storage for FSStorage {
    fn save(&self, key: &str, content: &[u8]) -> Result<String, Error> {
        check_key(key)?;

        let fpath = self.basepath.join(key);
        if let Some(parent) = fpath.parent() {
            DirBuilder::new().recursive(true).create(parent)?;
        }

        let file = File::create(&fpath)?;
        let mut buf_writer = BufWriter::new(file);
        buf_writer.write_all(content)?;
        buf_writer.flush()?;
        Ok(key.into())
    }

    fn load(&self, key: &str) -> Result<Vec<u8>, Error> {
        check_key(key)?;

        let file = File::open(self.basepath.join(key))?;
        let mut buf_reader = BufReader::new(file);
        let mut contents = Vec::new();
        buf_reader.read_to_end(&mut contents)?;
        Ok(contents)
    }
}

#[derive(Debug, Default)]
pub struct MemStorage {
    storage: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemStorage {
    pub fn new() -> MemStorage {
        MemStorage::default()
    }

    pub fn len(&self) -> usize {
        self.storage.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Storage for MemStorage {
    fn save(&self, key: &str, content: &[u8]) -> Result<String, Error> {
        check_key(key)?;
        let mut lock = self.storage.lock().map_err(poisoned)?;
        lock.insert(key.into(), content.into());
        Ok(key.into())
    }

    fn load(&self, key: &str) -> Result<Vec<u8>, Error> {
        let lock = self.storage.lock().map_err(poisoned)?;
        let v = lock.get(key).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("key not found: {}", key),
            )
        })?;
        Ok(v.clone())
    }
}

/// Store the hex encoding of `sketch` under `key`.
pub fn save_sketch<S: Storage + ?Sized>(
    storage: &S,
    key: &str,
    sketch: &Sketch,
) -> Result<String, Error> {
    storage.save(key, sketch.to_hex()?.as_bytes())
}

/// Load a sketch saved with [`save_sketch`]. The key becomes its name.
pub fn load_sketch<S: Storage + ?Sized>(storage: &S, key: &str) -> Result<Sketch, Error> {
    let raw = storage.load(key)?;
    let mut sketch = Sketch::from_hex(&String::from_utf8_lossy(&raw))?;
    sketch.set_name(key);
    Ok(sketch)
}
