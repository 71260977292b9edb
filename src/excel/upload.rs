//! Upload policy for matrix workbooks.

use crate::error::{MapaError, MapaResult};

/// 10 MB
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const ALLOWED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// Reject files with an unsupported extension or over [`MAX_UPLOAD_BYTES`].
pub fn check_upload(file_name: &str, size: usize) -> MapaResult<()> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(MapaError::Upload(
            "Formato de arquivo inválido. Use .xlsx ou .xls".to_string(),
        ));
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(MapaError::Upload(
            "Arquivo muito grande. Tamanho máximo: 10MB".to_string(),
        ));
    }
    Ok(())
}
