//! The [`IpTool`] handle: command execution plus interface listing.
//!
//! Operations live in sibling modules (`ops`, `bridge`, `sysctl`, `neigh`)
//! as further `impl` blocks on the same type.

use tracing::{debug, instrument, warn};

use nas_os_common::shell::{self, CommandOutput, CommandRunner};
use nas_os_common::NasResult;

use crate::commands::CommandBuilder;
use crate::config::ToolConfig;
use crate::interface::{parse_interfaces, InterfaceRecord, LinkClassifier, SysfsClassifier};
use crate::netns::{parse_netns_list, ExcludeNamespaces, NamespaceFilter, DEFAULT_VRF};

/// Drives the Linux networking CLIs through a [`CommandRunner`].
///
/// Share between tasks with `Arc<IpTool<R>>`; every method takes `&self`.
pub struct IpTool<R: CommandRunner> {
    runner: R,
    commands: CommandBuilder,
    classifier: Box<dyn LinkClassifier>,
    namespace_filter: Box<dyn NamespaceFilter>,
    management_vrf: String,
}

impl<R: CommandRunner> IpTool<R> {
    pub fn new(runner: R, config: &ToolConfig) -> Self {
        Self {
            runner,
            commands: CommandBuilder::from_config(config),
            classifier: Box::new(SysfsClassifier::new(config.sysfs_net_root.clone())),
            namespace_filter: Box::new(ExcludeNamespaces::new(config.excluded_namespaces.clone())),
            management_vrf: config.management_vrf.clone(),
        }
    }

    /// Replaces the namespace filter installed from `excluded_namespaces`.
    pub fn with_namespace_filter(mut self, filter: impl NamespaceFilter + 'static) -> Self {
        self.namespace_filter = Box::new(filter);
        self
    }

    /// Replaces the sysfs link classifier.
    pub fn with_classifier(mut self, classifier: impl LinkClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn commands(&self) -> &CommandBuilder {
        &self.commands
    }

    pub(crate) fn management_vrf(&self) -> &str {
        &self.management_vrf
    }

    pub(crate) async fn exec(&self, argv: &[String], log_fail: bool) -> NasResult<CommandOutput> {
        shell::run(&self.runner, argv, log_fail).await
    }

    /// Runs `argv` and reports success as a boolean.
    pub(crate) async fn exec_ok(&self, argv: &[String], log_fail: bool) -> NasResult<bool> {
        Ok(self.exec(argv, log_fail).await?.success())
    }

    /// Lists network namespaces, minus the excluded ones.
    ///
    /// A failing `ip netns list` is returned as `CommandFailed`.
    pub async fn list_namespaces(&self) -> NasResult<Vec<String>> {
        let argv = self.commands.netns_list();
        let output = shell::run_checked(&self.runner, &argv).await?;
        let namespaces = parse_netns_list(&output.lines);
        Ok(self.namespace_filter.retain(namespaces))
    }

    /// Lists interfaces of one VRF, or of every namespace when `vrf` is
    /// `None`.
    ///
    /// Without namespaces the `default` VRF is queried. Failures yield an
    /// empty (or partial) list; use [`try_list_interfaces_in`] to tell
    /// failure from absence.
    ///
    /// [`try_list_interfaces_in`]: IpTool::try_list_interfaces_in
    #[instrument(skip(self))]
    pub async fn list_interfaces(
        &self,
        vrf: Option<&str>,
        dev: Option<&str>,
    ) -> Vec<InterfaceRecord> {
        let vrfs = match vrf {
            Some(vrf) => vec![vrf.to_string()],
            None => match self.list_namespaces().await {
                Ok(namespaces) if namespaces.is_empty() => vec![DEFAULT_VRF.to_string()],
                Ok(namespaces) => namespaces,
                Err(e) => {
                    warn!(error = %e, "Cannot enumerate namespaces");
                    return Vec::new();
                }
            },
        };

        let mut records = Vec::new();
        for vrf in &vrfs {
            match self.try_list_interfaces_in(vrf, dev).await {
                Ok(mut found) => records.append(&mut found),
                Err(e) => debug!(vrf = %vrf, error = %e, "Interface listing failed"),
            }
        }
        records
    }

    /// Lists interfaces of exactly one VRF, surfacing command failures.
    pub async fn try_list_interfaces_in(
        &self,
        vrf: &str,
        dev: Option<&str>,
    ) -> NasResult<Vec<InterfaceRecord>> {
        self.query_addresses(vrf, dev, false).await
    }

    /// Like [`try_list_interfaces_in`](IpTool::try_list_interfaces_in) but
    /// with `ip -d`, which reports link kinds such as `macvlan`.
    pub async fn list_interface_details(
        &self,
        vrf: &str,
        dev: Option<&str>,
    ) -> NasResult<Vec<InterfaceRecord>> {
        self.query_addresses(vrf, dev, true).await
    }

    async fn query_addresses(
        &self,
        vrf: &str,
        dev: Option<&str>,
        details: bool,
    ) -> NasResult<Vec<InterfaceRecord>> {
        let argv = self.commands.addr_show(vrf, dev, details);
        let output = shell::run_checked(&self.runner, &argv).await?;
        let classifier = self.classifier.as_ref();
        Ok(parse_interfaces(&output.lines, vrf, classifier))
    }

    /// Silent existence check.
    pub async fn interface_exists(&self, vrf: &str, ifname: &str) -> NasResult<bool> {
        let argv = self.commands.link_show(vrf, ifname);
        self.exec_ok(&argv, false).await
    }
}
