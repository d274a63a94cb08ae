//! BlueZ GATT front end (`bluez` feature).
//!
//! Serves the six-characteristic chamber service over BlueZ and keeps the
//! LE advertisement registered. Runs entirely on the protocol stack's own
//! tokio runtime — characteristic reads come from the published snapshot,
//! writes are validated and queued on the [`ProtocolLink`], and
//! notifications drain the latest-value-wins hub. The monitoring cycle is
//! never blocked from here.

use std::sync::Arc;
use std::time::Duration;

use bluer::adv::Advertisement;
use bluer::gatt::local::{
    Application, Characteristic, CharacteristicNotify, CharacteristicNotifyMethod,
    CharacteristicRead, CharacteristicWrite, CharacteristicWriteMethod, ReqError, Service,
};
use bluer::Uuid;
use futures::FutureExt;
use log::{info, warn};

use crate::config::ChamberConfig;
use crate::error::ProtocolError;
use crate::protocol::advertise::{advertising_name, RetryPolicy};
use crate::protocol::link::ProtocolLink;
use crate::protocol::{
    WriteTarget, CHAR_ACTUATOR_STATUS, CHAR_CONTROL_TARGETS, CHAR_ENVIRONMENTAL,
    CHAR_OVERRIDE_BITS, CHAR_STAGE_STATE, CHAR_STATUS_FLAGS, SERVICE_UUID,
};

fn map_req_err(e: ProtocolError) -> ReqError {
    match e {
        ProtocolError::BadLength { .. } => ReqError::InvalidValueLength,
        ProtocolError::Busy => ReqError::InProgress,
        _ => ReqError::NotSupported,
    }
}

// ── Characteristic builders ──────────────────────────────────

fn read_char(
    link: Arc<ProtocolLink>,
    read: impl Fn(&ProtocolLink) -> Vec<u8> + Send + Sync + Copy + 'static,
) -> CharacteristicRead {
    CharacteristicRead {
        read: true,
        fun: Box::new(move |_req| {
            let link = link.clone();
            async move { Ok(read(&link)) }.boxed()
        }),
        ..Default::default()
    }
}

fn write_char(link: Arc<ProtocolLink>, target: WriteTarget) -> CharacteristicWrite {
    CharacteristicWrite {
        write: true,
        method: CharacteristicWriteMethod::Fun(Box::new(move |new_value, _req| {
            let link = link.clone();
            async move {
                link.handle_write(target, &new_value).map_err(map_req_err)
            }
            .boxed()
        })),
        ..Default::default()
    }
}

/// Which notify slot a characteristic drains.
#[derive(Clone, Copy)]
enum NotifySlot {
    Environmental,
    Status,
    Actuators,
}

fn notify_char(link: Arc<ProtocolLink>, slot: NotifySlot) -> CharacteristicNotify {
    CharacteristicNotify {
        notify: true,
        method: CharacteristicNotifyMethod::Fun(Box::new(move |mut notifier| {
            let link = link.clone();
            async move {
                link.set_client_connected(true);
                loop {
                    let frame: Vec<u8> = match slot {
                        NotifySlot::Environmental => {
                            link.notify().wait_environmental().await.to_vec()
                        }
                        NotifySlot::Status => link.notify().wait_status().await.to_vec(),
                        NotifySlot::Actuators => link.notify().wait_actuators().await.to_vec(),
                    };
                    if notifier.is_stopped() {
                        break;
                    }
                    if let Err(e) = notifier.notify(frame).await {
                        warn!("notification send failed: {e}");
                        break;
                    }
                }
                link.set_client_connected(false);
            }
            .boxed()
        })),
        ..Default::default()
    }
}

fn build_application(link: &Arc<ProtocolLink>) -> Application {
    Application {
        services: vec![Service {
            uuid: Uuid::from_u128(SERVICE_UUID),
            primary: true,
            characteristics: vec![
                Characteristic {
                    uuid: Uuid::from_u128(CHAR_ENVIRONMENTAL),
                    read: Some(read_char(link.clone(), |l| l.read_environmental().to_vec())),
                    notify: Some(notify_char(link.clone(), NotifySlot::Environmental)),
                    ..Default::default()
                },
                Characteristic {
                    uuid: Uuid::from_u128(CHAR_CONTROL_TARGETS),
                    read: Some(read_char(link.clone(), |l| l.read_targets().to_vec())),
                    write: Some(write_char(link.clone(), WriteTarget::ControlTargets)),
                    ..Default::default()
                },
                Characteristic {
                    uuid: Uuid::from_u128(CHAR_STAGE_STATE),
                    read: Some(read_char(link.clone(), |l| l.read_stage().to_vec())),
                    write: Some(write_char(link.clone(), WriteTarget::StageState)),
                    ..Default::default()
                },
                Characteristic {
                    uuid: Uuid::from_u128(CHAR_OVERRIDE_BITS),
                    write: Some(write_char(link.clone(), WriteTarget::OverrideBits)),
                    ..Default::default()
                },
                Characteristic {
                    uuid: Uuid::from_u128(CHAR_STATUS_FLAGS),
                    read: Some(read_char(link.clone(), |l| l.read_status().to_vec())),
                    notify: Some(notify_char(link.clone(), NotifySlot::Status)),
                    ..Default::default()
                },
                Characteristic {
                    uuid: Uuid::from_u128(CHAR_ACTUATOR_STATUS),
                    read: Some(read_char(link.clone(), |l| l.read_actuators().to_vec())),
                    notify: Some(notify_char(link.clone(), NotifySlot::Actuators)),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }],
        ..Default::default()
    }
}

// ── Advertisement ─────────────────────────────────────────────

/// Register the LE advertisement with timeout + bounded backoff. On
/// exhaustion the device remains connectable by its adapter alias.
async fn register_advertisement(
    adapter: &bluer::Adapter,
    name: &str,
    config: &ChamberConfig,
) -> Option<bluer::adv::AdvertisementHandle> {
    let policy = RetryPolicy::from_config(config);
    let timeout = Duration::from_secs(u64::from(config.adv_timeout_secs));
    let mut backoff_attempt = 0u32;

    for attempt in 0..policy.max_attempts {
        let adv = Advertisement {
            advertisement_type: bluer::adv::Type::Peripheral,
            service_uuids: vec![Uuid::from_u128(SERVICE_UUID)].into_iter().collect(),
            discoverable: Some(true),
            local_name: Some(name.to_string()),
            ..Default::default()
        };

        match tokio::time::timeout(timeout, adapter.advertise(adv)).await {
            Ok(Ok(handle)) => {
                info!("advertisement '{name}' registered");
                return Some(handle);
            }
            Err(_elapsed) => {
                warn!(
                    "advertisement registration timed out after {timeout:?}; \
                     continuing name-only"
                );
                return None;
            }
            Ok(Err(e)) if e.kind == bluer::ErrorKind::AlreadyExists => {
                // Stale registration from a previous incarnation; BlueZ
                // frees it once our old handle is gone, so retry under a
                // fresh advertisement object without backoff.
                warn!("stale advertisement path; retrying with a fresh registration");
            }
            Ok(Err(e)) => {
                let delay = policy.backoff(backoff_attempt);
                backoff_attempt += 1;
                warn!(
                    "advertisement registration failed ({e}), attempt {}/{}, \
                     retrying in {delay:?}",
                    attempt + 1,
                    policy.max_attempts
                );
                tokio::time::sleep(delay).await;
            }
        }
    }

    warn!("advertisement registration exhausted retries; continuing name-only");
    None
}

// ── Entry point ───────────────────────────────────────────────

/// Serve the GATT application until the process exits. Intended to run on
/// a dedicated protocol thread under a current-thread tokio runtime.
pub async fn run(link: Arc<ProtocolLink>, config: ChamberConfig) -> bluer::Result<()> {
    let session = bluer::Session::new().await?;
    let adapter = session.default_adapter().await?;
    adapter.set_powered(true).await?;

    let snap = link.snapshot();
    let name = advertising_name(&config.adv_name_prefix, snap.stage.species, snap.stage.stage);
    // The alias keeps the device discoverable by name even when the
    // service-UUID advertisement is degraded.
    adapter.set_alias(name.to_string()).await?;

    info!(
        "BLE up on adapter {} as '{}'",
        adapter.name(),
        name.as_str()
    );

    let _app_handle = adapter
        .serve_gatt_application(build_application(&link))
        .await?;
    let _adv_handle = register_advertisement(&adapter, name.as_str(), &config).await;

    // Handles must stay alive for as long as the service runs.
    futures::future::pending::<()>().await;
    Ok(())
}
