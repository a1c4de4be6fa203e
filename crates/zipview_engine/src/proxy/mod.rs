mod fetch;

pub use fetch::{
    FetchState, ProxiedResponse, fetch_with_redirects, hop_request, referer_for,
};
