//! Domain loading: authenticate, resolve the catalog, fetch every asset.

use bytes::Bytes;
use demesne_catalog::{AssetKind, ResolvedCatalog, SplatFormat};
use demesne_fetch::{
    Credential, HttpClient, ProgressCallback, ReqwestClient, RetryPolicy, Transport,
};
use serde::Deserialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::error::DomainError;
use crate::metadata::DomainMetadata;
use crate::portal::{Portal, PortalListing};
use crate::session::{DomainAuthResponse, DomainSession, ServiceTokenResponse};
use crate::splat::SingleSplat;

#[derive(Debug, Deserialize)]
struct DataListingResponse {
    data: Vec<demesne_catalog::CatalogItem>,
}

/// Everything a domain load produces.
///
/// Optional assets that the domain does not carry, or whose download failed,
/// are `None`; the catalog records what the server listed either way.
/// Immutable once returned.
#[derive(Debug, Clone)]
pub struct DomainDataCollection {
    pub session: DomainSession,
    pub catalog: ResolvedCatalog,
    /// Canonical refinement id, when the domain metadata names one.
    pub refinement: Option<String>,
    /// Row-major alignment transform for refined assets.
    pub alignment_matrix: Option<[f32; 16]>,
    /// Navigation mesh, OBJ text.
    pub nav_mesh: Option<Bytes>,
    /// Occlusion mesh, OBJ text.
    pub occlusion_mesh: Option<Bytes>,
    /// Refined point cloud, PLY.
    pub point_cloud: Option<Bytes>,
    /// Single-file gaussian splat for the canonical refinement. Partitioned
    /// splats are delivered by [`DomainClient::stream_splat`] instead.
    pub splat: Option<SingleSplat>,
}

/// Client for one domain service deployment.
///
/// Generic over the [`HttpClient`] so tests can substitute a scripted
/// transport; [`DomainClient::new`] builds the production reqwest client.
///
/// ```no_run
/// use demesne_client::{ClientConfig, DomainClient};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let client = DomainClient::new(ClientConfig {
///     api_server: "https://api.example.com".into(),
///     dds_server: "https://dds.example.com".into(),
///     app_key: "key".into(),
///     app_secret: "secret".into(),
///     client_id: "viewer-1".into(),
/// })?;
/// let domain = client
///     .load_domain("dom-1", &CancellationToken::new(), None)
///     .await?;
/// println!("{} catalog items", domain.catalog.items().len());
/// # Ok(())
/// # }
/// ```
pub struct DomainClient<C = ReqwestClient> {
    pub(crate) transport: Transport<C>,
    config: ClientConfig,
}

impl DomainClient<ReqwestClient> {
    pub fn new(config: ClientConfig) -> Result<Self, DomainError> {
        let client = ReqwestClient::new().map_err(|err| DomainError::Config(err.to_string()))?;
        Self::with_client(client, config)
    }
}

impl<C: HttpClient> DomainClient<C> {
    /// Build a client over a caller-supplied transport.
    ///
    /// Configuration is validated here, before any network call.
    pub fn with_client(client: C, config: ClientConfig) -> Result<Self, DomainError> {
        config.validate()?;
        let transport = Transport::new(client, config.client_id.clone());
        Ok(Self { transport, config })
    }

    /// Per-call timeout for every network operation. Defaults to 60 s.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.transport = self.transport.with_timeout(timeout);
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.transport = self.transport.with_retry_policy(policy);
        self
    }

    /// Exchange application credentials for a domain-scoped session.
    ///
    /// Two steps: a Basic-authenticated service token grant, then the
    /// per-domain auth exchange that names the domain's asset server.
    /// Rejected credentials abort with [`DomainError::Authentication`].
    pub async fn authenticate(
        &self,
        domain_id: &str,
        cancel: &CancellationToken,
    ) -> Result<DomainSession, DomainError> {
        let service_credential = Credential::Basic {
            key: self.config.app_key.clone(),
            secret: self.config.app_secret.clone(),
        };
        let service: ServiceTokenResponse = self
            .transport
            .post_json(
                &service_token_url(&self.config.api_server),
                &service_credential,
                None,
                cancel,
            )
            .await
            .map_err(|err| DomainError::from_fetch(err, "service token", domain_id, None))?;

        let auth: DomainAuthResponse = self
            .transport
            .post_json(
                &domain_auth_url(&self.config.dds_server, domain_id),
                &Credential::Bearer(service.access_token),
                None,
                cancel,
            )
            .await
            .map_err(|err| DomainError::from_fetch(err, "domain auth", domain_id, None))?;

        Ok(DomainSession::new(domain_id.to_string(), auth))
    }

    /// Fetch and classify the domain's data listing.
    pub async fn fetch_catalog(
        &self,
        session: &DomainSession,
        cancel: &CancellationToken,
    ) -> Result<ResolvedCatalog, DomainError> {
        let listing: DataListingResponse = self
            .transport
            .get_json(&session.data_listing_url(), &session.credential(), cancel)
            .await
            .map_err(|err| DomainError::from_fetch(err, "catalog", &session.domain_id, None))?;
        Ok(ResolvedCatalog::new(listing.data))
    }

    /// Download one catalog item's raw bytes.
    pub async fn fetch_item(
        &self,
        session: &DomainSession,
        item_id: &str,
        cancel: &CancellationToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Bytes, DomainError> {
        self.transport
            .get_bytes(
                &session.item_url(item_id),
                &session.credential(),
                cancel,
                on_progress,
            )
            .await
            .map_err(|err| {
                DomainError::from_fetch(err, "item download", &session.domain_id, Some(item_id))
            })
    }

    /// Download and parse the domain metadata document.
    ///
    /// A catalog without a metadata item yields empty metadata; a download or
    /// parse failure is fatal.
    pub async fn fetch_metadata(
        &self,
        session: &DomainSession,
        catalog: &ResolvedCatalog,
        cancel: &CancellationToken,
    ) -> Result<DomainMetadata, DomainError> {
        match catalog.metadata() {
            Some(reference) => {
                let bytes = self
                    .fetch_item(session, &reference.item_id, cancel, None)
                    .await?;
                DomainMetadata::parse(&bytes)
            }
            None => Ok(DomainMetadata::default()),
        }
    }

    /// Fetch the domain's portal poses as the server reported them.
    pub async fn fetch_portals(
        &self,
        session: &DomainSession,
        cancel: &CancellationToken,
    ) -> Result<Vec<Portal>, DomainError> {
        let listing: PortalListing = self
            .transport
            .get_json(&session.lighthouses_url(), &session.credential(), cancel)
            .await
            .map_err(|err| DomainError::from_fetch(err, "lighthouses", &session.domain_id, None))?;
        Ok(listing.poses)
    }

    /// Load everything a domain offers, in one call.
    ///
    /// Authentication and the catalog fetch are required and abort the load
    /// on failure, as does a malformed metadata document. The nav mesh,
    /// occlusion mesh, point cloud, and single-file splat are fetched
    /// concurrently and are each independently optional: a failure there is
    /// logged and the field comes back `None`. Cancellation is the one
    /// failure that is never downgraded.
    pub async fn load_domain(
        &self,
        domain_id: &str,
        cancel: &CancellationToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<DomainDataCollection, DomainError> {
        let session = self.authenticate(domain_id, cancel).await?;
        let catalog = self.fetch_catalog(&session, cancel).await?;

        let metadata = self.fetch_metadata(&session, &catalog, cancel).await?;
        let refinement = metadata.canonical_refinement;

        let nav_item = catalog.nav_mesh().map(|r| r.item_id.clone());
        let occlusion_item = catalog.occlusion_mesh().map(|r| r.item_id.clone());
        let point_cloud_item = refinement
            .as_deref()
            .and_then(|r| catalog.point_cloud(r))
            .map(|r| r.item_id.clone());
        let splat_item = refinement
            .as_deref()
            .and_then(|r| catalog.splat_single(r))
            .and_then(|r| match &r.kind {
                AssetKind::SplatSingle { format, .. } => Some((r.item_id.clone(), *format)),
                _ => None,
            });

        let (nav_mesh, occlusion_mesh, point_cloud, splat) = tokio::join!(
            self.fetch_optional(&session, nav_item.as_deref(), "nav_mesh", cancel, on_progress),
            self.fetch_optional(
                &session,
                occlusion_item.as_deref(),
                "occlusion_mesh",
                cancel,
                on_progress,
            ),
            self.fetch_optional(
                &session,
                point_cloud_item.as_deref(),
                "point_cloud",
                cancel,
                on_progress,
            ),
            self.fetch_splat_single(&session, splat_item.as_ref(), cancel, on_progress),
        );

        Ok(DomainDataCollection {
            refinement,
            alignment_matrix: metadata.canonical_refinement_alignment_matrix,
            nav_mesh: nav_mesh?,
            occlusion_mesh: occlusion_mesh?,
            point_cloud: point_cloud?,
            splat: splat?,
            catalog,
            session,
        })
    }

    /// Download one optional asset, downgrading failure to absence.
    ///
    /// Cancellation keeps its identity so a cancelled load never masquerades
    /// as a domain without assets.
    async fn fetch_optional(
        &self,
        session: &DomainSession,
        item_id: Option<&str>,
        asset: &str,
        cancel: &CancellationToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Option<Bytes>, DomainError> {
        let Some(item_id) = item_id else {
            return Ok(None);
        };
        match self.fetch_item(session, item_id, cancel, on_progress).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.is_cancelled() => Err(err),
            Err(err) => {
                tracing::warn!(
                    asset,
                    item_id,
                    domain_id = %session.domain_id,
                    error = %err,
                    "optional asset fetch failed, continuing without it"
                );
                Ok(None)
            }
        }
    }

    async fn fetch_splat_single(
        &self,
        session: &DomainSession,
        target: Option<&(String, SplatFormat)>,
        cancel: &CancellationToken,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Option<SingleSplat>, DomainError> {
        let Some((item_id, format)) = target else {
            return Ok(None);
        };
        let bytes = self
            .fetch_optional(session, Some(item_id), "splat", cancel, on_progress)
            .await?;
        Ok(bytes.map(|bytes| SingleSplat {
            item_id: item_id.clone(),
            format: *format,
            bytes,
        }))
    }
}

fn service_token_url(api_server: &str) -> String {
    format!(
        "{}/service/domains-access-token",
        api_server.trim_end_matches('/')
    )
}

fn domain_auth_url(dds_server: &str, domain_id: &str) -> String {
    format!(
        "{}/api/v1/domains/{}/auth",
        dds_server.trim_end_matches('/'),
        domain_id
    )
}
