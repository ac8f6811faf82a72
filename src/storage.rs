//! Client and order file persistence.
//!
//! A client file is a JSON array of `{"name": ..., "balance": {...}}`
//! records. Amounts are written as decimal strings; plain JSON numbers are
//! accepted on read. Order files hold a JSON array of
//! [`ExchangeOrder`] records in the same encoding.

use crate::core::bank::{ClientId, RegistrationError};
use crate::core::client::Client;
use crate::exchange::pool::ExchangeOrder;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default client file name.
pub const DEFAULT_CLIENTS_FILE: &str = "clients.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("i/o error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Outcome of loading a client file into a bank.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Clients that passed admission, in file order.
    pub admitted: Vec<ClientId>,
    /// Clients turned away at admission: a negative balance, or no supported
    /// currency.
    pub rejected: Vec<RegistrationError>,
}

/// Write clients to `path`.
///
/// The data goes to a temporary file next to `path` which is then renamed
/// over it, so an interrupted save leaves the previous file in place.
pub fn save_clients(path: impl AsRef<Path>, clients: &[Client]) -> Result<(), StorageError> {
    let path = path.as_ref();
    let io_err = |source| StorageError::Io {
        path: path.to_path_buf(),
        source,
    };

    let json = serde_json::to_vec_pretty(clients).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let tmp = temp_path(path);
    if let Err(source) = write_then_rename(&tmp, path, &json) {
        if let Err(e) = fs::remove_file(&tmp) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("could not remove {}: {}", tmp.display(), e);
            }
        }
        return Err(io_err(source));
    }

    debug!("saved {} clients to {}", clients.len(), path.display());
    Ok(())
}

fn write_then_rename(tmp: &Path, path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = fs::File::create(tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp, path)
}

/// Read clients from `path`. No admission check happens here.
pub fn load_clients(path: impl AsRef<Path>) -> Result<Vec<Client>, StorageError> {
    let path = path.as_ref();
    let clients: Vec<Client> = read_json(path).map_err(|err| {
        if matches!(err, StorageError::NotFound(_)) {
            info!("Clients file not found. No clients loaded.");
        }
        err
    })?;
    debug!("read {} clients from {}", clients.len(), path.display());
    Ok(clients)
}

/// Read a batch of exchange orders from `path`.
pub fn load_orders(path: impl AsRef<Path>) -> Result<Vec<ExchangeOrder>, StorageError> {
    let path = path.as_ref();
    let orders: Vec<ExchangeOrder> = read_json(path)?;
    debug!("read {} orders from {}", orders.len(), path.display());
    Ok(orders)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StorageError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StorageError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(StorageError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_str(&content).map_err(|source| StorageError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| DEFAULT_CLIENTS_FILE.into());
    name.push(".tmp");
    path.with_file_name(name)
}
