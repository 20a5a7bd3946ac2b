pub mod app;
pub mod ui;

use std::error::Error;

use tap_trainer::catalog::Catalog;
use tap_trainer::config::{Config, GesturePolicy};

pub fn run(
    config: &Config,
    catalog: Catalog,
    policy: GesturePolicy,
) -> Result<(), Box<dyn Error>> {
    app::run(config, catalog, policy)
}
