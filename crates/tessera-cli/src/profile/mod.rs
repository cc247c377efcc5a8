//! Store selection: saved profile, flag overrides and backend dispatch.

mod backend;
pub mod storage;

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::debug;

use tessera_core::StoreUrl;
use tessera_file::FileBackend;
use tessera_http::{HttpStore, HttpStoreConfig};

use crate::cli::StoreArgs;

pub use backend::CliStore;
pub use storage::Profile;

/// Merge command-line overrides over the saved profile.
pub fn resolve(args: &StoreArgs) -> Result<Profile> {
    let saved = storage::load_profile()?;

    let store = match (&args.store, &saved) {
        (Some(store), _) => store.clone(),
        (None, Some(profile)) => profile.store.clone(),
        (None, None) => bail!(
            "No store configured. Pass --store, set TESSERA_STORE, or run 'tessera profile set --store URL'."
        ),
    };

    Ok(Profile {
        store,
        project: args
            .project
            .clone()
            .or_else(|| saved.as_ref().and_then(|p| p.project.clone())),
        token: args
            .token
            .clone()
            .or_else(|| saved.and_then(|p| p.token)),
    })
}

/// Open the selected store.
pub fn open(args: &StoreArgs) -> Result<Arc<CliStore>> {
    let profile = resolve(args)?;
    let url = StoreUrl::new(&profile.store).context("Invalid store URL")?;

    let store = if url.is_local() {
        let root = url
            .to_file_path()
            .context("Failed to convert file:// URL to path")?;
        debug!(root = %root.display(), "Opening file store");
        CliStore::File(FileBackend::new(root))
    } else {
        let project = profile
            .project
            .context("Hosted stores need a project. Pass --project or save one with 'tessera profile set'.")?;
        debug!(url = %url, %project, "Opening hosted store");
        let mut config = HttpStoreConfig::new(url, project);
        if let Some(token) = profile.token {
            config = config.with_token(token);
        }
        CliStore::Http(HttpStore::new(config).context("Failed to create HTTP client")?)
    };

    Ok(Arc::new(store))
}
