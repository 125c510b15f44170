use std::future::Future;

use gpa_types::{ProgramId, ResolutionStrategy, ResolvedStream};
use tracing::{debug, info, warn};

use crate::config::ResolverConfig;
use crate::error::{ResolverError, ResolverResult};
use crate::fetch::{HttpFetcher, PageFetcher};
use crate::markup::{canonicalize, extract_build_id, extract_initial_state, scan_markup};
use crate::playlist::select_best_variant;
use crate::program::ProgramInfo;
use crate::search::find_media_url;

/// Locates the playable stream behind a program page.
///
/// Strategies run in a fixed order against a single fetch of the page:
///
/// 1. the per-build structured data document ([`ResolutionStrategy::NextData`])
/// 2. the inline `window.__INITIAL_STATE__` assignment ([`ResolutionStrategy::InitialState`])
/// 3. a fixed list of markup patterns ([`ResolutionStrategy::MarkupPattern`])
///
/// A failing strategy is logged and the next one tried. Only a failure to
/// fetch the page itself is reported to the caller. Nothing is cached; two
/// resolutions against unchanged upstream content return the same result.
pub struct StreamResolver<F = HttpFetcher> {
    fetcher: F,
    config: ResolverConfig,
}

impl StreamResolver<HttpFetcher> {
    /// Resolver talking to the live site.
    pub fn from_config(config: ResolverConfig) -> ResolverResult<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::new(fetcher, config))
    }
}

impl<F: PageFetcher> StreamResolver<F> {
    pub fn new(fetcher: F, config: ResolverConfig) -> Self {
        Self { fetcher, config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Resolve a program page URL to an absolute stream URL.
    pub async fn resolve(&self, program_url: &str) -> ResolverResult<ResolvedStream> {
        let program_id = ProgramId::from_url(program_url)
            .map_err(|_| ResolverError::InvalidProgramUrl(program_url.to_string()))?;
        info!(program = %program_id, "resolving stream");
        let html = self.fetch_text(program_url).await?;
        self.resolve_page(&html, program_id).await
    }

    /// Resolve the stream and scrape program info from one fetch of the page.
    pub async fn resolve_with_info(
        &self,
        program_url: &str,
    ) -> ResolverResult<(ResolvedStream, ProgramInfo)> {
        let program_id = ProgramId::from_url(program_url)
            .map_err(|_| ResolverError::InvalidProgramUrl(program_url.to_string()))?;
        info!(program = %program_id, "resolving stream and program info");
        let html = self.fetch_text(program_url).await?;
        let info = ProgramInfo::from_html(&html, program_url);
        let stream = self.resolve_page(&html, program_id).await?;
        Ok((stream, info))
    }

    async fn resolve_page(&self, html: &str, program_id: ProgramId) -> ResolverResult<ResolvedStream> {
        let found = match self.try_next_data(html, &program_id).await {
            Some(url) => Some((url, ResolutionStrategy::NextData)),
            None => match self.try_initial_state(html) {
                Some(url) => Some((url, ResolutionStrategy::InitialState)),
                None => scan_markup(html).map(|(pattern, url)| {
                    debug!(pattern, "matched markup pattern");
                    (url, ResolutionStrategy::MarkupPattern)
                }),
            },
        };

        let Some((raw, strategy)) = found else {
            warn!(program = %program_id, "no stream found");
            return Err(ResolverError::StreamNotFound(program_id));
        };
        let url = canonicalize(&raw, &self.config.site_origin);
        info!(program = %program_id, %strategy, url = %url, "stream resolved");
        Ok(ResolvedStream {
            url,
            program_id,
            strategy,
        })
    }

    /// Fetch an HLS master playlist and return its best variant URL.
    pub async fn resolve_playlist(&self, playlist_url: &str) -> ResolverResult<String> {
        let text = self.fetch_text(playlist_url).await?;
        let variant = select_best_variant(&text, playlist_url)?;
        debug!(playlist = playlist_url, variant = %variant, "selected variant");
        Ok(variant)
    }

    /// Scrape descriptive metadata. Never fails; an unreachable page yields
    /// [`ProgramInfo::unknown`].
    pub async fn program_info(&self, program_url: &str) -> ProgramInfo {
        match self.fetch_text(program_url).await {
            Ok(html) => ProgramInfo::from_html(&html, program_url),
            Err(e) => {
                warn!("program info unavailable: {}", e);
                ProgramInfo::unknown(program_url)
            }
        }
    }

    async fn try_next_data(&self, html: &str, program_id: &ProgramId) -> Option<String> {
        let Some(build_id) = extract_build_id(html) else {
            debug!("no build id in page");
            return None;
        };
        let url = self.config.next_data_url(build_id, program_id);
        let data = match self.within(&url, self.fetcher.fetch_json(&url)).await {
            Ok(data) => data,
            Err(e) => {
                debug!("structured data unavailable: {}", e);
                return None;
            }
        };
        if data.get("pageProps").is_none() {
            debug!(url = %url, "structured data has no pageProps");
            return None;
        }
        find_media_url(&data).map(str::to_string)
    }

    fn try_initial_state(&self, html: &str) -> Option<String> {
        match extract_initial_state(html) {
            Ok(Some(state)) => find_media_url(&state).map(str::to_string),
            Ok(None) => None,
            Err(e) => {
                debug!("initial state unusable: {}", e);
                None
            }
        }
    }

    async fn fetch_text(&self, url: &str) -> ResolverResult<String> {
        self.within(url, self.fetcher.fetch_text(url)).await
    }

    async fn within<T>(
        &self,
        url: &str,
        step: impl Future<Output = ResolverResult<T>>,
    ) -> ResolverResult<T> {
        tokio::time::timeout(self.config.timeout(), step)
            .await
            .map_err(|_| ResolverError::fetch(url, "timed out"))?
    }
}
