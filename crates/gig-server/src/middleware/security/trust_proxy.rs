use std::net::SocketAddr;

use axum::extract::{ConnectInfo, Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::extract::ForwardedInfo;

/// Resolves the client behind `hops` trusted proxies into [`ForwardedInfo`].
pub(super) async fn trust_proxy(
    State(hops): State<usize>,
    mut request: Request,
    next: Next,
) -> Response {
    let peer_ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let info = ForwardedInfo::resolve(request.headers(), peer_ip, hops);
    request.extensions_mut().insert(info);

    next.run(request).await
}
