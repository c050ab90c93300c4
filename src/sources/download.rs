use std::{
    fs::{self, File},
    io::Write,
    path::Path,
};

use flate2::{write::GzEncoder, Compression};
use log::info;
use reqwest::{
    blocking::Client,
    header::{UPGRADE_INSECURE_REQUESTS, USER_AGENT},
};

use super::ReportError;

/// Get the document at `url`.  Anything other than a successful response is
/// taken as the document not being published yet.
pub fn download_bytes(url: &str) -> Result<Vec<u8>, ReportError> {
    let client = Client::new();
    let response = client
        .get(url)
        .header(USER_AGENT, "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36")
        .header(UPGRADE_INSECURE_REQUESTS, "1")
        .send()
        .map_err(|e| ReportError::NotPublished(format!("{url}: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(ReportError::NotPublished(format!("{url}: {status}")));
    }
    let bytes = response
        .bytes()
        .map_err(|e| ReportError::NotPublished(format!("{url}: {e}")))?;
    info!("downloaded {} bytes from {}", bytes.len(), url);
    Ok(bytes.to_vec())
}

/// Write `bytes` gzipped to `path`, creating the parent directories.
pub fn archive_gz(bytes: &[u8], path: &Path) -> Result<(), ReportError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let mut encoder = GzEncoder::new(File::create(path)?, Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{error::Error, io::Read};

    use flate2::read::GzDecoder;

    use super::*;

    #[test]
    fn archive_round_trip() -> Result<(), Box<dyn Error>> {
        let dir = std::env::temp_dir().join("covid19_es_download_test");
        let path = dir.join("2020/file.csv.gz");
        archive_gz(b"AN,01/08/2020,1", &path)?;
        let mut text = String::new();
        GzDecoder::new(File::open(&path)?).read_to_string(&mut text)?;
        assert_eq!(text, "AN,01/08/2020,1");
        fs::remove_dir_all(dir)?;
        Ok(())
    }

    #[ignore]
    #[test]
    fn missing_document_is_not_published() {
        let res = download_bytes(
            "https://www.mscbs.gob.es/profesionales/saludPublica/ccayes/alertasActual/nCov/documentos/Informe_Comunicacion_19000101.ods",
        );
        assert!(matches!(res, Err(ReportError::NotPublished(_))));
    }
}
