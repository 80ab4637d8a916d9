//! Networking service restarts
//!
//! Restarts are best effort. The written files are what matters; a failed
//! restart is logged and left for the next convergence pass or reboot.

use crate::command::{command_line, CommandRunner};
use crate::network::ResolvedNetwork;
use std::sync::Arc;
use tracing::{info, warn};

const DHCP_CLIENT_PROCESS: &str = "dhclient3";
const NETWORKING_INIT_SCRIPT: &str = "/etc/init.d/networking";
const INTERFACE_SERVICE: &str = "network-interface";

pub struct ServiceController {
    runner: Arc<dyn CommandRunner>,
}

impl ServiceController {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    /// Kill the DHCP client, then restart networking as a whole
    pub async fn restart_dhcp_networking(&self) {
        info!("Restarting DHCP client and networking");
        self.run_best_effort("pkill", &[DHCP_CLIENT_PROCESS]).await;
        self.run_best_effort(NETWORKING_INIT_SCRIPT, &["restart"]).await;
    }

    /// Stop then start the interface service of every network's device, in order
    pub async fn restart_interfaces(&self, networks: &[ResolvedNetwork]) {
        for network in networks {
            info!("Restarting interface {:?}", network.device);
            let interface = format!("INTERFACE={}", network.device);
            self.run_best_effort("service", &[INTERFACE_SERVICE, "stop", &interface]).await;
            self.run_best_effort("service", &[INTERFACE_SERVICE, "start", &interface]).await;
        }
    }

    async fn run_best_effort(&self, program: &str, args: &[&str]) {
        match self.runner.run_command(program, args).await {
            Ok(_) => {}
            // Discarded: activation is retried by the next pass
            Err(e) => warn!("Ignoring failure of '{}': {}", command_line(program, args), e),
        }
    }
}
