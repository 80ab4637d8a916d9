//! Network convergence orchestration
//!
//! Two modes:
//! - DHCP: converge the dhclient configuration; kill the client and restart
//!   networking only when it changed.
//! - Manual: resolve devices, converge the interfaces file, restart the
//!   affected devices when it changed, always rewrite resolv.conf, then hand
//!   the resolved networks to the announcer without waiting for it.

use crate::arp::Announcer;
use crate::command::CommandRunner;
use crate::config::ConfigPaths;
use crate::device::{DeviceMap, DeviceResolver};
use crate::error::{NetconvergeResult, ResultExt};
use crate::fs::FileSystem;
use crate::network::ResolvedNetwork;
use crate::render;
use crate::service::ServiceController;
use crate::settings::Networks;
use crate::writer::ConvergenceWriter;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[async_trait]
pub trait NetManager: Send + Sync {
    async fn setup_dhcp(&self, networks: &Networks) -> NetconvergeResult<()>;

    async fn setup_manual_networking(&self, networks: &Networks) -> NetconvergeResult<()>;
}

/// Converges ifupdown, dhclient and resolv.conf configuration
pub struct IfupdownNetManager {
    paths: ConfigPaths,
    resolver: DeviceResolver,
    writer: ConvergenceWriter,
    services: ServiceController,
    announcer: Arc<dyn Announcer>,
}

impl IfupdownNetManager {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        runner: Arc<dyn CommandRunner>,
        announcer: Arc<dyn Announcer>,
        paths: ConfigPaths,
    ) -> Self {
        Self {
            resolver: DeviceResolver::new(fs.clone(), paths.net_class_dir.clone()),
            writer: ConvergenceWriter::new(fs),
            services: ServiceController::new(runner),
            announcer,
            paths,
        }
    }

    pub fn paths(&self) -> &ConfigPaths {
        &self.paths
    }

    /// Current hardware address to device mapping
    pub async fn detect_devices(&self) -> NetconvergeResult<DeviceMap> {
        debug!("Scanning {} for devices", self.resolver.net_class_dir().display());
        self.resolver.resolve().await.context("Detecting mac addresses")
    }

    /// Bind every declared network to a device by hardware address
    pub async fn resolve_networks(&self, networks: &Networks) -> NetconvergeResult<Vec<ResolvedNetwork>> {
        let devices = self.detect_devices().await?;

        let mut resolved = Vec::with_capacity(networks.len());
        for (name, settings) in networks.iter() {
            let device = devices.get(&settings.mac).map(String::as_str);
            let network = ResolvedNetwork::resolve(settings, device)
                .context("Calculating network and broadcast")?;
            if !network.is_device_resolved() {
                warn!("No device with hardware address {:?} for network {}", settings.mac, name);
            }
            debug!("Network {} -> device {:?}", name, network.device);
            resolved.push(network);
        }

        Ok(resolved)
    }

    pub fn render_dhcp_config(&self, networks: &Networks) -> NetconvergeResult<String> {
        render::render_dhcp_config(&networks.dns_servers())
            .context("Generating config from template")
    }

    pub async fn render_network_interfaces(&self, networks: &Networks) -> NetconvergeResult<String> {
        let resolved = self.resolve_networks(networks).await?;
        render::render_network_interfaces(&resolved)
            .context("Generating config from template")
    }

    pub fn render_resolv_conf(&self, networks: &Networks) -> NetconvergeResult<String> {
        render::render_resolv_conf(&networks.dns_servers())
            .context("Generating config from template")
    }

    async fn write_network_interfaces(&self, networks: &Networks) -> NetconvergeResult<(Vec<ResolvedNetwork>, bool)> {
        let resolved = self.resolve_networks(networks).await?;

        let content = render::render_network_interfaces(&resolved)
            .context("Generating config from template")?;

        let path = &self.paths.interfaces;
        let written = self.writer.converge(path, &content).await
            .context(format!("Writing to {}", path.display()))?;

        Ok((resolved, written))
    }

    async fn write_resolv_conf(&self, networks: &Networks) -> NetconvergeResult<()> {
        let content = self.render_resolv_conf(networks)?;

        let path = &self.paths.resolv_conf;
        self.writer.write_always(path, &content).await
            .context(format!("Writing to {}", path.display()))
    }
}

#[async_trait]
impl NetManager for IfupdownNetManager {
    async fn setup_dhcp(&self, networks: &Networks) -> NetconvergeResult<()> {
        let content = self.render_dhcp_config(networks)?;

        let path = &self.paths.dhclient_conf;
        let written = self.writer.converge(path, &content).await
            .context(format!("Writing to {}", path.display()))?;

        if written {
            self.services.restart_dhcp_networking().await;
        } else {
            info!("DHCP client configuration unchanged");
        }

        Ok(())
    }

    async fn setup_manual_networking(&self, networks: &Networks) -> NetconvergeResult<()> {
        let (resolved, written) = self.write_network_interfaces(networks).await
            .context("Writing network interfaces")?;

        // One write result covers the whole batch
        if written {
            self.services.restart_interfaces(&resolved).await;
        } else {
            info!("Network interfaces unchanged");
        }

        self.write_resolv_conf(networks).await
            .context("Writing resolv.conf")?;

        self.announcer.announce(resolved);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::fake::RecordingRunner;
    use crate::error::NetconvergeError;
    use crate::fs::OsFileSystem;
    use crate::settings::NetworkSettings;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records each batch, and whether resolv.conf was in place when it arrived
    struct RecordingAnnouncer {
        resolv_conf: PathBuf,
        batches: Mutex<Vec<Vec<ResolvedNetwork>>>,
        resolv_conf_written: Mutex<Vec<bool>>,
    }

    impl RecordingAnnouncer {
        fn new(resolv_conf: PathBuf) -> Self {
            Self {
                resolv_conf,
                batches: Mutex::new(Vec::new()),
                resolv_conf_written: Mutex::new(Vec::new()),
            }
        }
    }

    impl Announcer for RecordingAnnouncer {
        fn announce(&self, networks: Vec<ResolvedNetwork>) {
            self.resolv_conf_written.lock().unwrap().push(self.resolv_conf.exists());
            self.batches.lock().unwrap().push(networks);
        }
    }

    struct Fixture {
        _root: TempDir,
        runner: Arc<RecordingRunner>,
        announcer: Arc<RecordingAnnouncer>,
        manager: IfupdownNetManager,
    }

    impl Fixture {
        fn new() -> Self {
            let root = TempDir::new().unwrap();
            let paths = ConfigPaths {
                dhclient_conf: root.path().join("etc/dhcp3/dhclient.conf"),
                interfaces: root.path().join("etc/network/interfaces"),
                resolv_conf: root.path().join("etc/resolv.conf"),
                net_class_dir: root.path().join("sys/class/net"),
            };
            fs::create_dir_all(&paths.net_class_dir).unwrap();

            let runner = Arc::new(RecordingRunner::default());
            let announcer = Arc::new(RecordingAnnouncer::new(paths.resolv_conf.clone()));
            let manager = IfupdownNetManager::new(
                Arc::new(OsFileSystem::new()),
                runner.clone(),
                announcer.clone(),
                paths,
            );

            Self { _root: root, runner, announcer, manager }
        }

        fn add_device(&self, name: &str, mac: &str) {
            let dir = self.manager.paths().net_class_dir.join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(dir.join("address"), format!("{}\n", mac)).unwrap();
        }

        fn read(&self, path: &Path) -> String {
            fs::read_to_string(path).unwrap()
        }
    }

    fn default_network() -> Networks {
        let mut networks = Networks::new();
        networks.insert("default", NetworkSettings {
            ip: "10.0.0.5".to_string(),
            netmask: "255.255.255.0".to_string(),
            mac: "aa:bb".to_string(),
            gateway: "10.0.0.1".to_string(),
            dns: vec!["8.8.8.8".to_string(), "8.8.4.4".to_string()],
            default: vec!["dns".to_string(), "gateway".to_string()],
        });
        networks
    }

    #[tokio::test]
    async fn test_manual_networking_scenario() {
        let fx = Fixture::new();
        fx.add_device("eth0", "aa:bb");

        fx.manager.setup_manual_networking(&default_network()).await.unwrap();

        let interfaces = fx.read(&fx.manager.paths().interfaces);
        assert!(interfaces.contains("auto eth0\niface eth0 inet static\n"));
        assert!(interfaces.contains("    address 10.0.0.5\n"));
        assert!(interfaces.contains("    network 10.0.0.0\n"));
        assert!(interfaces.contains("    netmask 255.255.255.0\n"));
        assert!(interfaces.contains("    broadcast 10.0.0.255\n"));
        assert!(interfaces.ends_with("    gateway 10.0.0.1"));

        let resolv = fx.read(&fx.manager.paths().resolv_conf);
        assert_eq!(resolv, "# Generated by bosh-agent\nnameserver 8.8.4.4\nnameserver 8.8.8.8\n");

        assert_eq!(fx.runner.calls(), vec![
            "service network-interface stop INTERFACE=eth0",
            "service network-interface start INTERFACE=eth0",
        ]);

        let batches = fx.announcer.batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 1);
        assert_eq!(batches[0][0].device, "eth0");
    }

    #[tokio::test]
    async fn test_manual_networking_unchanged_skips_restart() {
        let fx = Fixture::new();
        fx.add_device("eth0", "aa:bb");
        let networks = default_network();

        fx.manager.setup_manual_networking(&networks).await.unwrap();
        fs::write(&fx.manager.paths().resolv_conf, "stale").unwrap();
        fx.manager.setup_manual_networking(&networks).await.unwrap();

        // Restarts only from the first pass
        assert_eq!(fx.runner.calls().len(), 2);
        // resolv.conf is rewritten every pass
        assert!(fx.read(&fx.manager.paths().resolv_conf).contains("nameserver 8.8.4.4"));
        // The announcer runs every pass
        assert_eq!(fx.announcer.batches.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_manual_networking_announces_after_resolv_conf() {
        let fx = Fixture::new();
        fx.add_device("eth0", "aa:bb");
        let networks = default_network();

        fx.manager.setup_manual_networking(&networks).await.unwrap();
        fs::remove_file(&fx.manager.paths().resolv_conf).unwrap();
        fx.manager.setup_manual_networking(&networks).await.unwrap();

        assert_eq!(*fx.announcer.resolv_conf_written.lock().unwrap(), vec![true, true]);
    }

    #[tokio::test]
    async fn test_manual_networking_unresolved_device() {
        let fx = Fixture::new();
        fx.add_device("eth0", "cc:dd");

        fx.manager.setup_manual_networking(&default_network()).await.unwrap();

        let interfaces = fx.read(&fx.manager.paths().interfaces);
        assert!(interfaces.contains("\nauto \niface  inet static\n"));
        assert_eq!(fx.runner.calls(), vec![
            "service network-interface stop INTERFACE=",
            "service network-interface start INTERFACE=",
        ]);
    }

    #[tokio::test]
    async fn test_manual_networking_device_enumeration_failure() {
        let fx = Fixture::new();
        fs::remove_dir_all(&fx.manager.paths().net_class_dir).unwrap();

        let err = fx.manager.setup_manual_networking(&default_network()).await.unwrap_err();

        assert!(err.to_string().starts_with("Writing network interfaces: Detecting mac addresses: "));
        assert!(matches!(err.root_cause(), NetconvergeError::DeviceEnumeration { .. }));
        assert!(!fx.manager.paths().interfaces.exists());
        assert!(!fx.manager.paths().resolv_conf.exists());
        assert!(fx.runner.calls().is_empty());
        assert!(fx.announcer.batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_manual_networking_invalid_netmask() {
        let fx = Fixture::new();
        fx.add_device("eth0", "aa:bb");
        let mut networks = default_network();
        networks.insert("broken", NetworkSettings {
            ip: "10.0.0.6".to_string(),
            netmask: "not-a-mask".to_string(),
            ..Default::default()
        });

        let err = fx.manager.setup_manual_networking(&networks).await.unwrap_err();
        assert!(err.to_string().contains("Calculating network and broadcast"));
        assert!(matches!(err.root_cause(), NetconvergeError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_dhcp_writes_and_restarts_once() {
        let fx = Fixture::new();
        let networks = default_network();

        fx.manager.setup_dhcp(&networks).await.unwrap();

        let conf = fx.read(&fx.manager.paths().dhclient_conf);
        assert!(conf.ends_with(
            "prepend domain-name-servers 8.8.4.4;\nprepend domain-name-servers 8.8.8.8;\n"
        ));
        assert_eq!(fx.runner.calls(), vec!["pkill dhclient3", "/etc/init.d/networking restart"]);
    }

    #[tokio::test]
    async fn test_dhcp_unchanged_issues_no_commands() {
        let fx = Fixture::new();
        let networks = default_network();
        let content = fx.manager.render_dhcp_config(&networks).unwrap();
        let path = &fx.manager.paths().dhclient_conf;
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();

        fx.manager.setup_dhcp(&networks).await.unwrap();

        assert!(fx.runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_dhcp_write_failure_has_path_context() {
        let fx = Fixture::new();
        // A directory where the file should be makes the write fail
        fs::create_dir_all(&fx.manager.paths().dhclient_conf).unwrap();

        let err = fx.manager.setup_dhcp(&default_network()).await.unwrap_err();
        let expected = format!("Writing to {}", fx.manager.paths().dhclient_conf.display());
        assert!(err.to_string().starts_with(&expected));
        assert!(fx.runner.calls().is_empty());
    }
}
