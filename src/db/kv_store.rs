// src/db/kv_store.rs

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use dashmap::DashMap;
use tempfile::NamedTempFile;

use crate::common::error::AppError;

// Armazenamento chave/valor "do lado do cliente": cada sessão tem sua área
// (`scope`) e dentro dela chaves fixas (carrinho, perfil, ...). Leitura e
// escrita são síncronas; a última escrita vence.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, scope: &str, key: &str) -> Result<Option<String>, AppError>;

    fn set(&self, scope: &str, key: &str, value: &str) -> Result<(), AppError>;

    fn remove(&self, scope: &str, key: &str) -> Result<(), AppError>;
}

// =============================================================================
//  ARQUIVOS (um JSON por sessão/chave)
// =============================================================================

#[derive(Debug, Clone)]
pub struct FileKvStore {
    root: PathBuf,
}

impl FileKvStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, AppError> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, scope: &str, key: &str) -> Result<PathBuf, AppError> {
        for part in [scope, key] {
            if !is_safe_segment(part) {
                return Err(AppError::StorageError(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("segmento de chave inválido: {:?}", part),
                )));
            }
        }
        Ok(self.root.join(scope).join(format!("{key}.json")))
    }
}

fn is_safe_segment(part: &str) -> bool {
    !part.is_empty()
        && part
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

impl KeyValueStore for FileKvStore {
    fn get(&self, scope: &str, key: &str) -> Result<Option<String>, AppError> {
        let path = self.path_for(scope, key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, scope: &str, key: &str, value: &str) -> Result<(), AppError> {
        let path = self.path_for(scope, key)?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        write_atomically(&path, value)?;
        Ok(())
    }

    fn remove(&self, scope: &str, key: &str) -> Result<(), AppError> {
        let path = self.path_for(scope, key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// Escreve num temporário de nome único e renomeia: quem lê nunca vê um JSON
// pela metade e escritas concorrentes na mesma chave não disputam o arquivo
fn write_atomically(path: &Path, value: &str) -> io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(value.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

// =============================================================================
//  MEMÓRIA
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: DashMap<(String, String), String>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get(&self, scope: &str, key: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .entries
            .get(&(scope.to_string(), key.to_string()))
            .map(|entry| entry.value().clone()))
    }

    fn set(&self, scope: &str, key: &str, value: &str) -> Result<(), AppError> {
        self.entries
            .insert((scope.to_string(), key.to_string()), value.to_string());
        Ok(())
    }

    fn remove(&self, scope: &str, key: &str) -> Result<(), AppError> {
        self.entries.remove(&(scope.to_string(), key.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_persists_and_removes_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(dir.path()).unwrap();

        assert_eq!(store.get("session-1", "cart").unwrap(), None);
        store.set("session-1", "cart", r#"{"items":[]}"#).unwrap();
        assert_eq!(
            store.get("session-1", "cart").unwrap().as_deref(),
            Some(r#"{"items":[]}"#)
        );

        // Outra instância apontando para o mesmo diretório enxerga o valor
        let reopened = FileKvStore::new(dir.path()).unwrap();
        assert!(reopened.get("session-1", "cart").unwrap().is_some());

        store.remove("session-1", "cart").unwrap();
        store.remove("session-1", "cart").unwrap();
        assert_eq!(store.get("session-1", "cart").unwrap(), None);
    }

    #[test]
    fn concurrent_writes_to_one_key_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(FileKvStore::new(dir.path()).unwrap());

        let writers: Vec<_> = (0..8)
            .map(|n| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..25 {
                        store.set("session-1", "cart", &format!("{{\"writer\":{n}}}")).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        // A última escrita vence e nenhum temporário fica para trás
        let value = store.get("session-1", "cart").unwrap().unwrap();
        assert!(value.starts_with(r#"{"writer":"#));
        let files = fs::read_dir(dir.path().join("session-1")).unwrap().count();
        assert_eq!(files, 1);
    }

    #[test]
    fn file_store_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::new(dir.path()).unwrap();
        assert!(store.set("../escape", "cart", "{}").is_err());
        assert!(store.get("session", "a/b").is_err());
    }

    #[test]
    fn scopes_are_isolated() {
        let store = MemoryKvStore::new();
        store.set("a", "cart", "1").unwrap();
        assert_eq!(store.get("b", "cart").unwrap(), None);
    }
}
