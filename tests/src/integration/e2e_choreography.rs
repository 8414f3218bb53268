//! # End-to-End Choreography
//!
//! Boots a provider node from configuration, starts services through the
//! services manager and talks to them as a consumer:
//!
//! ```text
//! consumer ──dial──→ DialogWaiter ──allow-list──→ SessionDialogHandler
//!                                                      │ CreateSession
//!                                                      ▼
//!                                    WireguardService::provide_config
//!                                                      │
//! manager.stop ──ServiceStatus(NotRunning)──→ ServiceCleaner ──→ storage purge
//! ```

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::timeout;

    use node_runtime::adapters::HmacSignerFactory;
    use node_runtime::{bootstrap_services, NodeConfig, NodeContainer, StartRequest};
    use pn_03_dialog::{ChannelKey, DialogError, DialogRequest, DialogResponse};
    use pn_04_session::SessionStorage;
    use shared_bus::{EventFilter, EventTopic, NodeEvent, SessionStatus};
    use shared_types::{Identity, ServiceState, SessionId};

    use crate::integration::doubles::identity;

    const SECRET: &str = "e2e-dialog-secret";

    fn node_config() -> NodeConfig {
        let mut config = NodeConfig::default();
        config.identity.signer_secret = SECRET.into();
        config.nat.upnp_enabled = false;
        config.location.public_ip = Some(IpAddr::V4(Ipv4Addr::new(198, 51, 100, 10)));
        config.location.country = "SE".into();
        config.location.outbound_probe = "127.0.0.1:9".into();
        config.wireguard.ports = "51000:51005".into();
        config.services.access_policy = vec![identity(11).address];
        config
    }

    fn wireguard_request(config: &NodeConfig, allowed: Vec<Identity>) -> StartRequest {
        StartRequest {
            service_type: "wireguard".into(),
            options: config.service_options("wireguard").unwrap(),
            access_policy: allowed,
        }
    }

    fn created_id(response: DialogResponse) -> SessionId {
        match response {
            DialogResponse::SessionCreated { session_id, .. } => session_id,
            other => panic!("expected SessionCreated, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_consumer_session_lifecycle_through_node() {
        let container = NodeContainer::new(node_config()).unwrap();
        let mut components = bootstrap_services(&container).await.unwrap();
        let mut session_events = container
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::Session]));

        let allowed = container.config.services.allow_list().unwrap();
        let request = wireguard_request(&container.config, allowed);
        let service_id = components.manager.start(request).await.unwrap();

        // The consumer checks the provider signed the channel it dialed.
        let channel = ChannelKey::new(&container.provider, "wireguard");
        let dialog = container.transport.dial(identity(11), &channel).await.unwrap();
        let signer = HmacSignerFactory::new(SECRET.as_bytes())
            .unwrap()
            .signer(&container.provider);
        assert!(signer.verify(channel.as_str().as_bytes(), dialog.signature()));
        assert_eq!(dialog.provider(), &container.provider);

        let response = dialog
            .request(DialogRequest::CreateSession {
                config: json!({ "public_key": "wg-consumer-key" }),
                ping_target: None,
            })
            .await
            .unwrap();
        let DialogResponse::SessionCreated {
            session_id,
            config,
            payments_required,
        } = response
        else {
            panic!("expected SessionCreated, got {response:?}");
        };
        assert!(payments_required);
        let port = config["port"].as_u64().unwrap();
        assert!((51000..=51005).contains(&port));
        assert_eq!(
            config["endpoint"],
            format!("198.51.100.10:{port}").as_str()
        );

        let session = components.sessions.find(&session_id).unwrap();
        assert_eq!(session.service_id, service_id);
        assert_eq!(session.consumer_id, identity(11));
        assert_eq!(session.service_type, "wireguard");
        let created = timeout(Duration::from_secs(1), session_events.recv())
            .await
            .expect("session event should be published")
            .unwrap();
        assert!(matches!(
            created,
            NodeEvent::Session {
                status: SessionStatus::Created,
                ..
            }
        ));

        // Stopping the service purges its sessions through the cleaner.
        components.manager.stop(service_id).await.unwrap();
        timeout(Duration::from_secs(2), async {
            while components.sessions.find(&session_id).is_some() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("cleaner should remove sessions of the stopped service");
        assert!(!container.transport.is_listening(&channel));

        components.shutdown(&container).await;
    }

    #[tokio::test]
    async fn test_unlisted_consumer_is_rejected() {
        let container = NodeContainer::new(node_config()).unwrap();
        let mut components = bootstrap_services(&container).await.unwrap();

        let allowed = container.config.services.allow_list().unwrap();
        let request = wireguard_request(&container.config, allowed);
        components.manager.start(request).await.unwrap();

        let channel = ChannelKey::new(&container.provider, "wireguard");
        let err = container
            .transport
            .dial(identity(12), &channel)
            .await
            .unwrap_err();
        assert_eq!(err, DialogError::IdentityNotAllowed(identity(12)));
        assert!(components.sessions.get_all().is_empty());

        components.shutdown(&container).await;
        assert!(components.manager.list().is_empty());
    }

    #[tokio::test]
    async fn test_dialog_close_destroys_sessions() {
        let container = NodeContainer::new(node_config()).unwrap();
        let mut components = bootstrap_services(&container).await.unwrap();

        let request = wireguard_request(&container.config, Vec::new());
        components.manager.start(request).await.unwrap();

        let channel = ChannelKey::new(&container.provider, "wireguard");
        let dialog = container.transport.dial(identity(7), &channel).await.unwrap();
        let first = created_id(
            dialog
                .request(DialogRequest::CreateSession {
                    config: json!({ "public_key": "a" }),
                    ping_target: None,
                })
                .await
                .unwrap(),
        );
        let second = created_id(
            dialog
                .request(DialogRequest::CreateSession {
                    config: json!({ "public_key": "b" }),
                    ping_target: None,
                })
                .await
                .unwrap(),
        );
        assert_ne!(first, second);
        assert_eq!(components.sessions.get_all().len(), 2);

        dialog.close();
        timeout(Duration::from_secs(2), async {
            while !components.sessions.get_all().is_empty() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("closing the dialog should destroy its sessions");

        components.shutdown(&container).await;
    }

    #[tokio::test]
    async fn test_service_status_sequence_for_failed_start() {
        let container = NodeContainer::new(node_config()).unwrap();
        let components = bootstrap_services(&container).await.unwrap();
        let mut status_events = container
            .bus
            .subscribe(EventFilter::topics(vec![EventTopic::ServiceStatus]));

        // OpenVPN options given to the wireguard factory.
        let request = StartRequest {
            service_type: "wireguard".into(),
            options: container.config.service_options("openvpn").unwrap(),
            access_policy: Vec::new(),
        };
        assert!(components.manager.start(request).await.is_err());

        let mut statuses = Vec::new();
        while let Ok(Some(event)) = status_events.try_recv() {
            if let NodeEvent::ServiceStatus { status, .. } = event {
                statuses.push(status);
            }
        }
        assert_eq!(statuses, vec![ServiceState::Starting, ServiceState::NotRunning]);
        assert!(components.manager.list().is_empty());
    }
}
