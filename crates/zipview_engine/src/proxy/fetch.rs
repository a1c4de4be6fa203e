/* 📖 # Why model redirect following as a state machine?

Redirects are followed here rather than by the HTTP client because every hop needs its own
Referer, and because the outcome has to be classified precisely: exhausted redirects,
a redirect without a Location and a terminal upstream status are all distinct errors.

`FetchState::on_response` is the complete transition table and touches no I/O, so each
transition is tested on its own. `fetch_with_redirects` only drives it with the PAL.
*/

use tracing::{debug, info, instrument};
use url::Url;
use zipview_base::error::ErrorKind;
use zipview_base::{HttpResponse, OutboundRequest, Pal, ZipviewError, ZipviewResult};

use crate::config::ProxyConfig;

/// The states of a single proxied fetch.
#[derive(Debug)]
pub enum FetchState {
    /// About to request `url`, having followed `redirects` redirects so far.
    Fetching { url: Url, redirects: usize },
    /// A 2xx response arrived from `url`.
    Completed { url: Url, response: HttpResponse },
    Failed(Box<ZipviewError>),
}

impl FetchState {
    /// Initial state for a target URL. Only absolute http(s) URLs are accepted.
    pub fn start(target: &str) -> Self {
        match Url::parse(target) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                FetchState::Fetching { url, redirects: 0 }
            }
            Ok(url) => FetchState::Failed(Box::new(ZipviewError::new(ErrorKind::Validation {
                message: format!("Unsupported URL scheme: {}", url.scheme()),
            }))),
            Err(e) => FetchState::Failed(Box::new(ZipviewError::new(ErrorKind::Validation {
                message: format!("Invalid URL {:?}: {}", target, e),
            }))),
        }
    }

    /// Transition after `url` answered with `response`.
    pub fn on_response(
        url: Url,
        redirects: usize,
        response: HttpResponse,
        max_redirects: usize,
    ) -> Self {
        let status = response.status();
        if status.is_success() {
            return FetchState::Completed { url, response };
        }
        if !status.is_redirect() {
            return FetchState::Failed(Box::new(ZipviewError::new(ErrorKind::Upstream {
                status: status.as_u16(),
            })));
        }
        if redirects >= max_redirects {
            return FetchState::Failed(Box::new(ZipviewError::new(
                ErrorKind::TooManyRedirects { max: max_redirects },
            )));
        }
        let Some(location) = response.headers().get("location") else {
            return FetchState::Failed(Box::new(ZipviewError::new(ErrorKind::Protocol {
                message: format!("Redirect ({}) without Location header", status.as_u16()),
            })));
        };
        match url.join(location) {
            Ok(next) => FetchState::Fetching {
                url: next,
                redirects: redirects + 1,
            },
            Err(e) => FetchState::Failed(Box::new(ZipviewError::new(ErrorKind::Protocol {
                message: format!("Invalid redirect location {:?}: {}", location, e),
            }))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, FetchState::Fetching { .. })
    }
}

/// `scheme://host/` of a URL, sent as Referer.
pub fn referer_for(url: &Url) -> String {
    format!("{}://{}/", url.scheme(), url.host_str().unwrap_or_default())
}

/// The outbound request for one hop.
pub fn hop_request(url: &Url, config: &ProxyConfig) -> OutboundRequest {
    OutboundRequest::get(url.as_str())
        .with_timeout(config.timeout())
        .with_header("User-Agent", config.user_agent.as_str())
        .with_header("Accept", "*/*")
        .with_header("Accept-Language", "en-US,en;q=0.9")
        .with_header("Referer", referer_for(url))
}

/// The successful end of a proxied fetch.
#[derive(Debug)]
pub struct ProxiedResponse {
    /// URL of the hop that answered with 2xx.
    pub final_url: Url,
    pub response: HttpResponse,
}

/// GET `target`, following redirects up to `config.max_redirects`.
///
/// Each hop is a fresh request with its own timeout and Referer.
#[instrument(skip(pal, config))]
pub fn fetch_with_redirects(
    pal: &dyn Pal,
    target: &str,
    config: &ProxyConfig,
) -> ZipviewResult<ProxiedResponse> {
    let mut state = FetchState::start(target);
    loop {
        state = match state {
            FetchState::Fetching { url, redirects } => {
                debug!(%url, redirects, "fetching");
                match pal.fetch(&hop_request(&url, config)) {
                    Ok(response) => {
                        FetchState::on_response(url, redirects, response, config.max_redirects)
                    }
                    Err(error) => FetchState::Failed(error),
                }
            }
            FetchState::Completed { url, response } => {
                info!(final_url = %url, status = response.status().as_u16(), "fetch completed");
                return Ok(ProxiedResponse {
                    final_url: url,
                    response,
                });
            }
            FetchState::Failed(error) => return Err(error),
        };
    }
}
