use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use gouvre_core::encryption;
use gouvre_core::{AppError, Config, DecryptFailurePolicy, TokenCodec};
use gouvre_processing::content_type::describe;
use gouvre_processing::{ThumbnailGenerator, ThumbnailParams};
use gouvre_storage::FileStore;

use super::types::{IssuedLink, ResolvedFile, ThumbnailLinks, UploadOutcome};
use crate::link_store::LinkStore;

/// Suffix of the file holding `hash(secret)` next to an encrypted file.
const SECRET_SIDECAR_SUFFIX: &str = ".secret";

/// Knobs the orchestrator takes from configuration.
#[derive(Debug, Clone, Copy)]
pub struct AccessSettings {
    pub thumbnail_quality: u8,
    pub max_thumbnail_resolution: u32,
    pub decrypt_failure_policy: DecryptFailurePolicy,
}

impl Default for AccessSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl AccessSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            thumbnail_quality: config.thumbnail_quality,
            max_thumbnail_resolution: config.max_thumbnail_resolution,
            decrypt_failure_policy: config.decrypt_failure_policy,
        }
    }
}

fn secret_sidecar(filename: &str) -> String {
    format!("{}{}", filename, SECRET_SIDECAR_SUFFIX)
}

fn non_empty(secret: Option<&str>) -> Option<&str> {
    secret.filter(|s| !s.is_empty())
}

/// Run CPU-bound work (encryption, thumbnailing) off the async workers.
async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))?
}

/// Issues and honors links. Stateless apart from the shared [`LinkStore`], so it is cloned
/// freely into handlers.
#[derive(Clone)]
pub struct AccessService {
    codec: TokenCodec,
    storage: Arc<dyn FileStore>,
    links: LinkStore,
    thumbnails: ThumbnailGenerator,
    settings: AccessSettings,
}

impl AccessService {
    pub fn new(
        codec: TokenCodec,
        storage: Arc<dyn FileStore>,
        links: LinkStore,
        settings: AccessSettings,
    ) -> Self {
        Self {
            codec,
            storage,
            links,
            thumbnails: ThumbnailGenerator::new(settings.thumbnail_quality),
            settings,
        }
    }

    pub fn links(&self) -> &LinkStore {
        &self.links
    }

    pub fn settings(&self) -> &AccessSettings {
        &self.settings
    }

    /// Reject names that can never be served: empty, path-like, or secret sidecars.
    fn ensure_servable_name(filename: &str) -> Result<(), AppError> {
        if filename.trim().is_empty() {
            return Err(AppError::InvalidInput("filename is required".to_string()));
        }
        if filename.contains("..") || filename.contains('/') || filename.contains('\\') {
            return Err(AppError::InvalidInput(format!(
                "'{}' is not a valid file name",
                filename
            )));
        }
        if filename.ends_with(SECRET_SIDECAR_SUFFIX) {
            return Err(AppError::NotFound(format!("File not found: {}", filename)));
        }
        Ok(())
    }

    fn validate_resolution(&self, resolution: u32) -> Result<(), AppError> {
        let max = self.settings.max_thumbnail_resolution;
        if resolution == 0 || resolution > max {
            return Err(AppError::InvalidInput(format!(
                "resolution must be between 1 and {}",
                max
            )));
        }
        Ok(())
    }

    /// Confirm `filename` is stored and that `secret` matches how it was stored: encrypted
    /// files need the secret they were uploaded with, plain files must not be given one.
    #[tracing::instrument(skip(self, secret))]
    pub async fn check_file_exists(
        &self,
        filename: &str,
        secret: Option<&str>,
    ) -> Result<(), AppError> {
        Self::ensure_servable_name(filename)?;

        if !self.storage.exists(filename).await? {
            return Err(AppError::NotFound(format!("File not found: {}", filename)));
        }

        self.verify_secret(filename, secret).await
    }

    async fn verify_secret(&self, filename: &str, secret: Option<&str>) -> Result<(), AppError> {
        let sidecar = secret_sidecar(filename);
        let stored_hash = if self.storage.exists(&sidecar).await? {
            Some(self.storage.read(&sidecar).await?)
        } else {
            None
        };

        match (stored_hash, non_empty(secret)) {
            (None, None) => Ok(()),
            (Some(stored_hash), Some(secret)) => {
                let stored_hash = String::from_utf8_lossy(&stored_hash);
                if encryption::verify_hash(secret, stored_hash.trim()) {
                    Ok(())
                } else {
                    Err(AppError::NotAuthorized(
                        "Encryption secret does not match".to_string(),
                    ))
                }
            }
            (Some(_), None) => Err(AppError::NotAuthorized(
                "File is encrypted; an encryption secret is required".to_string(),
            )),
            (None, Some(_)) => Err(AppError::InvalidInput(
                "File is not encrypted; omit the encryption secret".to_string(),
            )),
        }
    }

    /// Issue a read link for an existing file.
    #[tracing::instrument(skip(self, secret))]
    pub async fn create_link(
        &self,
        filename: &str,
        secret: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<IssuedLink, AppError> {
        self.check_file_exists(filename, secret).await?;

        let token = self.codec.create_token(
            filename,
            expires_at,
            non_empty(secret).unwrap_or_default(),
            &[],
        )?;

        tracing::info!(expires_at = %expires_at, "Read link issued");

        Ok(IssuedLink {
            token,
            expires_at: whole_seconds(expires_at),
        })
    }

    /// Issue a single-use upload link. `resolutions` are square thumbnails generated as soon
    /// as the upload lands.
    #[tracing::instrument(skip(self, secret))]
    pub async fn create_upload_link(
        &self,
        filename: &str,
        secret: Option<&str>,
        resolutions: &[u32],
        expires_at: DateTime<Utc>,
    ) -> Result<IssuedLink, AppError> {
        Self::ensure_servable_name(filename)?;
        for &resolution in resolutions {
            self.validate_resolution(resolution)?;
        }

        let token = self.codec.create_token(
            filename,
            expires_at,
            non_empty(secret).unwrap_or_default(),
            resolutions,
        )?;
        self.links.record_upload(&token, expires_at).await;

        tracing::info!(
            expires_at = %expires_at,
            resolutions = ?resolutions,
            encrypted = non_empty(secret).is_some(),
            "Upload link issued"
        );

        Ok(IssuedLink {
            token,
            expires_at: whole_seconds(expires_at),
        })
    }

    /// Store the body of an upload made through a single-use link.
    #[tracing::instrument(skip(self, token, data), fields(size_bytes = data.len()))]
    pub async fn upload(&self, token: &str, data: Bytes) -> Result<UploadOutcome, AppError> {
        let claims = self.codec.parse_token(token)?;
        claims.ensure_not_expired(Utc::now())?;
        Self::ensure_servable_name(&claims.filename)?;

        if data.is_empty() {
            return Err(AppError::InvalidInput("Upload body is empty".to_string()));
        }

        if !self.links.try_consume(token).await {
            tracing::warn!(filename = %claims.filename, "Upload link unknown or already used");
            return Err(AppError::InvalidToken);
        }

        let secret = claims.has_secret().then_some(claims.secret.as_str());
        self.store_file(&claims.filename, data.clone(), secret)
            .await?;

        let mut thumbnails = Vec::with_capacity(claims.resolutions.len());
        for &resolution in &claims.resolutions {
            let params = ThumbnailParams::new(claims.filename.as_str(), resolution, true);
            match self.store_thumbnail(&params, data.clone(), secret).await {
                Ok(derived) => thumbnails.push(derived),
                Err(e) => {
                    tracing::warn!(
                        filename = %claims.filename,
                        resolution,
                        error = %e,
                        "Skipping thumbnail for upload"
                    );
                }
            }
        }

        tracing::info!(
            filename = %claims.filename,
            thumbnails = thumbnails.len(),
            "Upload stored"
        );

        Ok(UploadOutcome {
            filename: claims.filename,
            thumbnails,
        })
    }

    /// Decode a read link and load the file behind it.
    #[tracing::instrument(skip(self, token))]
    pub async fn resolve_link(&self, token: &str) -> Result<ResolvedFile, AppError> {
        let claims = self.codec.parse_token(token)?;
        let now = Utc::now();
        claims.ensure_not_expired(now)?;
        Self::ensure_servable_name(&claims.filename)?;

        // Upload links stay in the link store until they expire; they never grant reads.
        if self.links.state(token).await.is_some() {
            tracing::warn!(filename = %claims.filename, "Upload link used as a read link");
            return Err(AppError::InvalidToken);
        }

        let stored = self.storage.read(&claims.filename).await?;

        let data = if claims.has_secret() {
            let secret = claims.secret.clone();
            let ciphertext = stored.clone();
            let attempt =
                run_blocking(move || Ok(encryption::decrypt(&ciphertext, &secret))).await?;

            match (attempt, self.settings.decrypt_failure_policy) {
                (Ok(plaintext), _) => Bytes::from(plaintext),
                (Err(e), DecryptFailurePolicy::Reject) => return Err(e.into()),
                (Err(_), DecryptFailurePolicy::Passthrough) => {
                    tracing::warn!(
                        filename = %claims.filename,
                        "Decryption failed, serving stored bytes unchanged"
                    );
                    stored
                }
            }
        } else {
            stored
        };

        Ok(ResolvedFile {
            content_type: describe(&data),
            max_age_secs: claims.seconds_until_expiry(now),
            filename: claims.filename,
            expires_at: claims.expires_at,
            data,
        })
    }

    /// Issue read links to thumbnails of `filenames`, generating any that aren't cached yet.
    /// A file that can't be thumbnailed is left out of the result instead of failing the
    /// whole batch.
    #[tracing::instrument(skip(self, filenames, secret), fields(count = filenames.len()))]
    pub async fn create_thumbnail_links(
        &self,
        filenames: &[String],
        resolution: u32,
        square: bool,
        secret: Option<&str>,
        expires_at: DateTime<Utc>,
    ) -> Result<ThumbnailLinks, AppError> {
        self.validate_resolution(resolution)?;

        let mut filename_to_token = BTreeMap::new();
        for filename in filenames {
            let params = ThumbnailParams::new(filename.as_str(), resolution, square);
            let derived = match self.check_or_create_thumbnail(&params, secret).await {
                Ok(derived) => derived,
                Err(e) => {
                    tracing::warn!(filename = %filename, error = %e, "Skipping thumbnail");
                    continue;
                }
            };

            let token = self.codec.create_token(
                &derived,
                expires_at,
                non_empty(secret).unwrap_or_default(),
                &[],
            )?;
            filename_to_token.insert(filename.clone(), token);
        }

        tracing::info!(
            issued = filename_to_token.len(),
            requested = filenames.len(),
            "Thumbnail links issued"
        );

        Ok(ThumbnailLinks {
            expires_at: whole_seconds(expires_at),
            filename_to_token,
        })
    }

    /// Reuse the derived file for `params` if present, otherwise generate and store it.
    /// Returns the derived file name.
    pub async fn check_or_create_thumbnail(
        &self,
        params: &ThumbnailParams,
        secret: Option<&str>,
    ) -> Result<String, AppError> {
        Self::ensure_servable_name(&params.filename)?;

        let derived = params.derived_filename();
        if self.storage.exists(&derived).await? {
            self.verify_secret(&derived, secret).await?;
            tracing::debug!(derived = %derived, "Reusing cached thumbnail");
            return Ok(derived);
        }

        let source = self.load_plaintext(&params.filename, secret).await?;
        self.store_thumbnail(params, source, secret).await
    }

    async fn load_plaintext(&self, filename: &str, secret: Option<&str>) -> Result<Bytes, AppError> {
        self.check_file_exists(filename, secret).await?;
        let data = self.storage.read(filename).await?;

        match non_empty(secret) {
            None => Ok(data),
            Some(secret) => {
                let secret = secret.to_string();
                run_blocking(move || {
                    encryption::decrypt(&data, &secret)
                        .map(Bytes::from)
                        .map_err(AppError::from)
                })
                .await
            }
        }
    }

    async fn store_thumbnail(
        &self,
        params: &ThumbnailParams,
        source: Bytes,
        secret: Option<&str>,
    ) -> Result<String, AppError> {
        let derived = params.derived_filename();
        let generator = self.thumbnails;
        let (resolution, square) = (params.resolution, params.square);

        let thumbnail = run_blocking(move || {
            generator
                .generate(&source, resolution, square)
                .map_err(AppError::from)
        })
        .await?;

        self.store_file(&derived, thumbnail, secret).await?;
        tracing::debug!(derived = %derived, "Thumbnail stored");
        Ok(derived)
    }

    /// Write `data` under `name`, encrypted with its sidecar when a secret is given. A plain
    /// write removes any sidecar left over from an earlier encrypted version.
    ///
    /// The data goes first. If the sidecar then can't be written, the data is removed again
    /// so no encrypted file is left without the hash that unlocks it.
    async fn store_file(&self, name: &str, data: Bytes, secret: Option<&str>) -> Result<(), AppError> {
        match non_empty(secret) {
            Some(secret) => {
                let owned = secret.to_string();
                let encrypted = run_blocking(move || {
                    encryption::encrypt(&data, &owned).map_err(AppError::from)
                })
                .await?;

                self.storage.write(name, &encrypted).await?;
                if let Err(e) = self
                    .storage
                    .write(&secret_sidecar(name), encryption::hash(secret).as_bytes())
                    .await
                {
                    tracing::error!(name = %name, error = %e, "Sidecar write failed, removing file");
                    if let Err(cleanup) = self.storage.delete(name).await {
                        tracing::error!(name = %name, error = %cleanup, "Failed to remove file");
                    }
                    return Err(e.into());
                }
            }
            None => {
                self.storage.write(name, &data).await?;
                self.storage.delete(&secret_sidecar(name)).await?;
            }
        }
        Ok(())
    }
}

/// Tokens carry whole seconds, so report expiries the same way.
fn whole_seconds(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(at.timestamp(), 0).unwrap_or(at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use gouvre_storage::LocalStorage;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    fn png(width: u32, height: u32) -> Bytes {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([x as u8, y as u8, 200]));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .unwrap();
        Bytes::from(cursor.into_inner())
    }

    struct Fixture {
        _dir: TempDir,
        storage: Arc<LocalStorage>,
        service: AccessService,
    }

    async fn fixture_with(settings: AccessSettings) -> Fixture {
        let dir = TempDir::new().unwrap();
        let storage = Arc::new(LocalStorage::new(dir.path()).await.unwrap());
        let codec = TokenCodec::from_key_bytes(&[7u8; 32]).unwrap();
        let service = AccessService::new(codec, storage.clone(), LinkStore::new(), settings);
        Fixture {
            _dir: dir,
            storage,
            service,
        }
    }

    async fn fixture() -> Fixture {
        fixture_with(AccessSettings::default()).await
    }

    fn in_one_hour() -> DateTime<Utc> {
        Utc::now() + Duration::hours(1)
    }

    #[tokio::test]
    async fn test_link_roundtrip_plain_file() {
        let f = fixture().await;
        let image = png(40, 20);
        f.storage.write("cat.png", &image).await.unwrap();

        let link = f.service.create_link("cat.png", None, in_one_hour()).await.unwrap();
        let resolved = f.service.resolve_link(&link.token).await.unwrap();

        assert_eq!(resolved.filename, "cat.png");
        assert_eq!(resolved.data, image);
        assert_eq!(resolved.content_type, "image/png");
        assert_eq!(resolved.expires_at, link.expires_at);
        assert!(resolved.max_age_secs > 3500 && resolved.max_age_secs <= 3600);
    }

    #[tokio::test]
    async fn test_create_link_requires_existing_file() {
        let f = fixture().await;
        let err = f
            .service
            .create_link("missing.png", None, in_one_hour())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_sidecars_are_never_served() {
        let f = fixture().await;
        f.storage.write("cat.png.secret", b"hash").await.unwrap();

        let err = f
            .service
            .create_link("cat.png.secret", None, in_one_hour())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_expired_link() {
        let f = fixture().await;
        f.storage.write("cat.png", &png(4, 4)).await.unwrap();

        let token = f
            .service
            .codec
            .create_token("cat.png", Utc::now() - Duration::seconds(1), "", &[])
            .unwrap();
        assert!(matches!(
            f.service.resolve_link(&token).await,
            Err(AppError::TokenExpired)
        ));
        assert!(matches!(
            f.service.resolve_link("garbage").await,
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_encrypted_upload_flow() {
        let f = fixture().await;
        let image = png(80, 40);

        let upload = f
            .service
            .create_upload_link("secret.png", Some("s3cr3t"), &[16, 32], in_one_hour())
            .await
            .unwrap();
        let outcome = f.service.upload(&upload.token, image.clone()).await.unwrap();

        assert_eq!(outcome.filename, "secret.png");
        assert_eq!(
            outcome.thumbnails,
            vec![
                "secret.png.16.sq.thumb.jpg".to_string(),
                "secret.png.32.sq.thumb.jpg".to_string()
            ]
        );

        // Stored encrypted, with the secret's hash alongside
        let stored = f.storage.read("secret.png").await.unwrap();
        assert_ne!(stored, image);
        assert!(f.storage.exists("secret.png.secret").await.unwrap());
        assert!(f.storage.exists("secret.png.16.sq.thumb.jpg.secret").await.unwrap());

        let link = f
            .service
            .create_link("secret.png", Some("s3cr3t"), in_one_hour())
            .await
            .unwrap();
        let resolved = f.service.resolve_link(&link.token).await.unwrap();
        assert_eq!(resolved.data, image);

        let thumb = f
            .service
            .create_link("secret.png.32.sq.thumb.jpg", Some("s3cr3t"), in_one_hour())
            .await
            .unwrap();
        let resolved = f.service.resolve_link(&thumb.token).await.unwrap();
        assert_eq!(resolved.content_type, "image/jpeg");

        assert!(matches!(
            f.service.create_link("secret.png", Some("guess"), in_one_hour()).await,
            Err(AppError::NotAuthorized(_))
        ));
        assert!(matches!(
            f.service.create_link("secret.png", None, in_one_hour()).await,
            Err(AppError::NotAuthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_upload_link_is_single_use() {
        let f = fixture().await;
        let upload = f
            .service
            .create_upload_link("once.png", None, &[], in_one_hour())
            .await
            .unwrap();

        // An empty body doesn't burn the link
        assert!(matches!(
            f.service.upload(&upload.token, Bytes::new()).await,
            Err(AppError::InvalidInput(_))
        ));

        f.service.upload(&upload.token, png(8, 8)).await.unwrap();
        assert!(matches!(
            f.service.upload(&upload.token, png(8, 8)).await,
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_read_link_cannot_upload() {
        let f = fixture().await;
        f.storage.write("cat.png", &png(4, 4)).await.unwrap();
        let link = f.service.create_link("cat.png", None, in_one_hour()).await.unwrap();

        assert!(matches!(
            f.service.upload(&link.token, png(8, 8)).await,
            Err(AppError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_upload_link_validates_resolutions() {
        let f = fixture().await;
        for resolutions in [vec![0u32], vec![64, 100_000]] {
            assert!(matches!(
                f.service
                    .create_upload_link("a.png", None, &resolutions, in_one_hour())
                    .await,
                Err(AppError::InvalidInput(_))
            ));
        }
        assert!(f.service.links().is_empty().await);
    }

    #[tokio::test]
    async fn test_decrypt_failure_rejected_by_default() {
        let f = fixture().await;
        f.storage.write("plain.png", &png(4, 4)).await.unwrap();

        let token = f
            .service
            .codec
            .create_token("plain.png", in_one_hour(), "not-the-secret", &[])
            .unwrap();
        assert!(matches!(
            f.service.resolve_link(&token).await,
            Err(AppError::DecryptFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_decrypt_failure_passthrough() {
        let f = fixture_with(AccessSettings {
            decrypt_failure_policy: DecryptFailurePolicy::Passthrough,
            ..AccessSettings::default()
        })
        .await;
        let ciphertext = encryption::encrypt(b"payload", "right").unwrap();
        f.storage.write("locked.bin", &ciphertext).await.unwrap();

        let token = f
            .service
            .codec
            .create_token("locked.bin", in_one_hour(), "wrong", &[])
            .unwrap();
        let resolved = f.service.resolve_link(&token).await.unwrap();
        assert_eq!(resolved.data.as_ref(), ciphertext.as_slice());
    }

    #[tokio::test]
    async fn test_thumbnail_batch_skips_failures() {
        let f = fixture().await;
        f.storage.write("wide.png", &png(400, 200)).await.unwrap();
        f.storage.write("tall.png", &png(100, 300)).await.unwrap();
        f.storage.write("notes.txt", b"not an image").await.unwrap();

        let filenames: Vec<String> = ["wide.png", "notes.txt", "missing.png", "tall.png"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let links = f
            .service
            .create_thumbnail_links(&filenames, 100, false, None, in_one_hour())
            .await
            .unwrap();

        assert_eq!(
            links.filename_to_token.keys().collect::<Vec<_>>(),
            vec!["tall.png", "wide.png"]
        );

        let resolved = f
            .service
            .resolve_link(&links.filename_to_token["wide.png"])
            .await
            .unwrap();
        assert_eq!(resolved.filename, "wide.png.100.thumb.jpg");
        let thumb = image::load_from_memory(&resolved.data).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (100, 50));
    }

    #[tokio::test]
    async fn test_thumbnail_reuses_cached_file() {
        let f = fixture().await;
        f.storage.write("cat.png", &png(50, 50)).await.unwrap();

        let params = ThumbnailParams::new("cat.png", 20, true);
        let derived = f.service.check_or_create_thumbnail(&params, None).await.unwrap();
        assert_eq!(derived, "cat.png.20.sq.thumb.jpg");

        f.storage.write(&derived, b"cached").await.unwrap();
        f.service.check_or_create_thumbnail(&params, None).await.unwrap();
        assert_eq!(f.storage.read(&derived).await.unwrap().as_ref(), b"cached");
    }

    #[tokio::test]
    async fn test_thumbnail_batch_rejects_bad_resolution() {
        let f = fixture().await;
        assert!(matches!(
            f.service
                .create_thumbnail_links(&["a.png".to_string()], 0, true, None, in_one_hour())
                .await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_encrypted_thumbnail_batch() {
        let f = fixture().await;
        let upload = f
            .service
            .create_upload_link("vault.png", Some("s3cr3t"), &[], in_one_hour())
            .await
            .unwrap();
        f.service.upload(&upload.token, png(60, 30)).await.unwrap();
        let filenames = vec!["vault.png".to_string()];

        // Generated from the decrypted source, stored encrypted
        let links = f
            .service
            .create_thumbnail_links(&filenames, 20, false, Some("s3cr3t"), in_one_hour())
            .await
            .unwrap();
        assert_eq!(links.filename_to_token.len(), 1);
        assert!(f.storage.exists("vault.png.20.thumb.jpg.secret").await.unwrap());
        let stored = f.storage.read("vault.png.20.thumb.jpg").await.unwrap();
        assert!(image::load_from_memory(&stored).is_err());

        let resolved = f
            .service
            .resolve_link(&links.filename_to_token["vault.png"])
            .await
            .unwrap();
        assert_eq!(resolved.content_type, "image/jpeg");
        let thumb = image::load_from_memory(&resolved.data).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (20, 10));

        // Cached thumbnail is reused with the right secret
        let again = f
            .service
            .create_thumbnail_links(&filenames, 20, false, Some("s3cr3t"), in_one_hour())
            .await
            .unwrap();
        assert_eq!(again.filename_to_token.len(), 1);
        assert_eq!(f.storage.read("vault.png.20.thumb.jpg").await.unwrap(), stored);

        // Wrong or missing secret: skipped, for both the cached and the uncached case
        for resolution in [20, 24] {
            for secret in [Some("guess"), None] {
                let links = f
                    .service
                    .create_thumbnail_links(&filenames, resolution, false, secret, in_one_hour())
                    .await
                    .unwrap();
                assert!(links.filename_to_token.is_empty());
            }
        }
        assert!(!f.storage.exists("vault.png.24.thumb.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn test_upload_link_cannot_read() {
        let f = fixture().await;
        f.storage.write("cat.png", &png(4, 4)).await.unwrap();
        let upload = f
            .service
            .create_upload_link("cat.png", None, &[], in_one_hour())
            .await
            .unwrap();

        assert!(matches!(
            f.service.resolve_link(&upload.token).await,
            Err(AppError::InvalidToken)
        ));

        f.service.upload(&upload.token, png(8, 8)).await.unwrap();
        assert!(matches!(
            f.service.resolve_link(&upload.token).await,
            Err(AppError::InvalidToken)
        ));
    }

    /// Local store that refuses to write secret sidecars.
    struct SidecarWriteFails(LocalStorage);

    #[async_trait::async_trait]
    impl FileStore for SidecarWriteFails {
        async fn read(&self, name: &str) -> gouvre_storage::StorageResult<Bytes> {
            self.0.read(name).await
        }

        async fn write(&self, name: &str, data: &[u8]) -> gouvre_storage::StorageResult<()> {
            if name.ends_with(SECRET_SIDECAR_SUFFIX) {
                return Err(gouvre_storage::StorageError::WriteFailed("disk full".to_string()));
            }
            self.0.write(name, data).await
        }

        async fn exists(&self, name: &str) -> gouvre_storage::StorageResult<bool> {
            self.0.exists(name).await
        }

        async fn delete(&self, name: &str) -> gouvre_storage::StorageResult<()> {
            self.0.delete(name).await
        }
    }

    #[tokio::test]
    async fn test_failed_sidecar_write_removes_file() {
        let dir = TempDir::new().unwrap();
        let local = LocalStorage::new(dir.path()).await.unwrap();
        let storage = Arc::new(SidecarWriteFails(local.clone()));
        let codec = TokenCodec::from_key_bytes(&[7u8; 32]).unwrap();
        let service =
            AccessService::new(codec, storage, LinkStore::new(), AccessSettings::default());

        let upload = service
            .create_upload_link("vault.png", Some("s3cr3t"), &[], in_one_hour())
            .await
            .unwrap();
        assert!(matches!(
            service.upload(&upload.token, png(8, 8)).await,
            Err(AppError::Storage(_))
        ));

        assert!(!local.exists("vault.png").await.unwrap());
        assert!(!local.exists("vault.png.secret").await.unwrap());
    }
}
