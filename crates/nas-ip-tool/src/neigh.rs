//! Neighbor cache flushing.

use tracing::instrument;

use nas_os_common::shell::CommandRunner;
use nas_os_common::NasResult;

use crate::interface::AddressFamily;
use crate::tool::IpTool;

impl<R: CommandRunner> IpTool<R> {
    /// Flushes neighbors of `family`, narrowed by device and/or address.
    /// With neither, the whole family table of the VRF is flushed.
    #[instrument(skip(self))]
    pub async fn flush_neighbors(
        &self,
        family: AddressFamily,
        dev: Option<&str>,
        addr: Option<&str>,
        vrf: &str,
    ) -> NasResult<bool> {
        let argv = self.commands().neigh_flush(vrf, family, dev, addr);
        self.exec_ok(&argv, true).await
    }
}
