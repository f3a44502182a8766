//! pinboard serve

use crate::document::DocumentLoader;
use crate::error::{Error, Result};
use crate::server::{self, AppState};

use super::Context;

pub fn run(ctx: &Context, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| ctx.config.server.bind.clone());
    if !ctx.config.store.is_configured() {
        tracing::info!("task store not configured; serving documents only");
    }
    let state = AppState::new(DocumentLoader::new(&ctx.docs_root), &ctx.config);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(Error::Io)?
        .block_on(server::serve(state, &bind))
}
