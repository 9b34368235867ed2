// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use anyhow::Result;
use oswin_framework::Framework;
use tracing::instrument;

pub struct TestFixtures {
    framework: Arc<Framework>,
}

impl TestFixtures {
    pub fn new(framework: Arc<Framework>) -> Self {
        Self { framework }
    }

    /// Fails the run up front if the compute API can't be reached with the
    /// configured endpoint and token.
    #[instrument(skip_all)]
    pub async fn execution_setup(&mut self) -> Result<()> {
        self.framework.verify_api().await
    }

    #[instrument(skip_all)]
    pub async fn execution_cleanup(&mut self) -> Result<()> {
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn test_setup(&mut self) -> Result<()> {
        Ok(())
    }

    /// Deletes whatever cloud resources the finished test left behind.
    #[instrument(skip_all)]
    pub async fn test_cleanup(&mut self) -> Result<()> {
        self.framework.cleanup_test_resources().await;
        Ok(())
    }
}
