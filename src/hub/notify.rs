//! Specialized publish helpers
//!
//! Status and data notifications publish to the device's room *and* replace
//! the corresponding snapshot. The snapshot write happens even when nobody is
//! subscribed, and a backend failure is logged without blocking the live
//! publish. Alerts fan out to every matching target room.

use chrono::Utc;
use serde_json::Value;

use crate::error::Result;
use crate::protocol::events::name;
use crate::protocol::{Alert, DataUpdate, OutboundFrame, StatusUpdate};
use crate::registry::RoomKey;
use crate::store::SnapshotKind;

use super::core::DeviceHub;

impl DeviceHub {
    /// Publish a `device:status` event and replace the status snapshot
    pub async fn notify_device_status(
        &self,
        device_id: &str,
        status: &str,
        metadata: Option<Value>,
    ) -> Result<()> {
        let update = StatusUpdate {
            device_id: device_id.to_string(),
            status: status.to_string(),
            metadata,
            timestamp: Utc::now(),
        };

        let frame = OutboundFrame::new(name::DEVICE_STATUS, &update)?;
        self.publish(&RoomKey::Device(device_id.to_string()), frame)
            .await;

        if let Err(e) = self
            .snapshots()
            .write(SnapshotKind::Status, device_id, &update)
            .await
        {
            tracing::warn!(device_id, error = %e, "Status snapshot write failed");
        }

        Ok(())
    }

    /// Publish a `device:data` event and replace the data snapshot
    pub async fn notify_device_data(&self, device_id: &str, data: Value) -> Result<()> {
        let update = DataUpdate {
            device_id: device_id.to_string(),
            data,
            timestamp: Utc::now(),
        };

        let frame = OutboundFrame::new(name::DEVICE_DATA, &update)?;
        self.publish(&RoomKey::Device(device_id.to_string()), frame)
            .await;

        if let Err(e) = self
            .snapshots()
            .write(SnapshotKind::Data, device_id, &update)
            .await
        {
            tracing::warn!(device_id, error = %e, "Data snapshot write failed");
        }

        Ok(())
    }

    /// Route an alert to every matching room
    ///
    /// User, organization and device targets are additive, and critical
    /// alerts additionally reach everyone holding the admin role.
    pub async fn notify_alert(&self, alert: Alert) -> Result<()> {
        let frame = OutboundFrame::new(name::ALERT, &alert)?;

        if let Some(user_id) = &alert.user_id {
            self.publish(&RoomKey::User(user_id.clone()), frame.clone())
                .await;
        }
        if let Some(org_id) = &alert.organization_id {
            self.publish(&RoomKey::Organization(org_id.clone()), frame.clone())
                .await;
        }
        if let Some(device_id) = &alert.device_id {
            self.publish(&RoomKey::Device(device_id.clone()), frame.clone())
                .await;
        }
        if alert.severity.is_critical() {
            self.publish(&RoomKey::Role("admin".to_string()), frame)
                .await;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::core::tests::{down_hub, test_conn, test_hub};
    use crate::protocol::AlertSeverity;
    use serde_json::json;

    fn alert(severity: AlertSeverity) -> Alert {
        Alert {
            id: "a1".to_string(),
            kind: "threshold".to_string(),
            severity,
            message: "overheat".to_string(),
            device_id: None,
            user_id: None,
            organization_id: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_status_publishes_and_snapshots() {
        let hub = test_hub();
        let (h, mut rx) = test_conn(1, "u1", "user");
        hub.rooms()
            .join(&h, RoomKey::Device("d1".to_string()))
            .await;

        hub.notify_device_status("d1", "error", Some(json!({"message": "overheat"})))
            .await
            .unwrap();

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.event, "device:status");
        let value: Value = serde_json::from_slice(&frame.json).unwrap();
        assert_eq!(value["data"]["deviceId"], "d1");
        assert_eq!(value["data"]["status"], "error");
        assert_eq!(value["data"]["metadata"]["message"], "overheat");
        assert!(value["data"]["timestamp"].is_string());

        let snap = hub.snapshot(SnapshotKind::Status, "d1").await.unwrap().unwrap();
        assert_eq!(snap["status"], "error");
    }

    #[tokio::test]
    async fn test_snapshot_written_with_no_subscribers() {
        let hub = test_hub();

        hub.notify_device_status("d1", "online", None).await.unwrap();
        hub.notify_device_data("d1", json!({"temp": 20.0})).await.unwrap();

        assert!(hub.snapshot(SnapshotKind::Status, "d1").await.unwrap().is_some());
        let data = hub.snapshot(SnapshotKind::Data, "d1").await.unwrap().unwrap();
        assert_eq!(data["data"]["temp"], 20.0);
    }

    #[tokio::test]
    async fn test_delivery_survives_snapshot_write_failure() {
        let hub = down_hub();
        let (h, mut rx) = test_conn(1, "u1", "user");
        hub.rooms()
            .join(&h, RoomKey::Device("d1".to_string()))
            .await;

        // An unreachable backend never blocks the live publish
        hub.notify_device_status("d1", "error", None).await.unwrap();
        hub.notify_device_data("d1", json!({"temp": 99.0})).await.unwrap();

        assert_eq!(rx.recv().await.unwrap().event, "device:status");
        assert_eq!(rx.recv().await.unwrap().event, "device:data");
    }

    #[tokio::test]
    async fn test_critical_alert_reaches_admin_room() {
        let hub = test_hub();
        let (admin, mut rx_admin) = test_conn(1, "root", "admin");
        let (user, mut rx_user) = test_conn(2, "u1", "user");

        hub.admit(&admin).await.unwrap();
        hub.admit(&user).await.unwrap();
        let _ = rx_admin.recv().await;
        let _ = rx_user.recv().await;

        // No user/device/org target at all, still lands on role:admin
        hub.notify_alert(alert(AlertSeverity::Critical)).await.unwrap();

        assert_eq!(rx_admin.recv().await.unwrap().event, "alert");
        assert!(rx_user.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_non_critical_alert_skips_admins() {
        let hub = test_hub();
        let (admin, mut rx_admin) = test_conn(1, "root", "admin");
        hub.admit(&admin).await.unwrap();
        let _ = rx_admin.recv().await;

        hub.notify_alert(alert(AlertSeverity::Warning)).await.unwrap();
        assert!(rx_admin.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_alert_fans_out_to_all_targets() {
        let hub = test_hub();
        let (user, mut rx_user) = test_conn(1, "u1", "user");
        let (org_member, mut rx_org) = test_conn(2, "u2", "user");
        let (dev_watcher, mut rx_dev) = test_conn(3, "u3", "user");

        hub.admit(&user).await.unwrap();
        let _ = rx_user.recv().await;
        hub.rooms()
            .join(&org_member, RoomKey::Organization("o1".to_string()))
            .await;
        hub.rooms()
            .join(&dev_watcher, RoomKey::Device("d1".to_string()))
            .await;

        let mut a = alert(AlertSeverity::Warning);
        a.user_id = Some("u1".to_string());
        a.organization_id = Some("o1".to_string());
        a.device_id = Some("d1".to_string());
        hub.notify_alert(a).await.unwrap();

        assert_eq!(rx_user.recv().await.unwrap().event, "alert");
        assert_eq!(rx_org.recv().await.unwrap().event, "alert");
        assert_eq!(rx_dev.recv().await.unwrap().event, "alert");
    }
}
