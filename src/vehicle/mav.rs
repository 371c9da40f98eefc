use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use mavlink::common::{
    MavCmd, MavFrame, MavMessage, MavModeFlag, PositionTargetTypemask, COMMAND_LONG_DATA,
    SET_POSITION_TARGET_GLOBAL_INT_DATA,
};
use mavlink::{MavConnection, MavHeader};
use tracing::{debug, error, info, warn};

use super::VehicleDriver;
use crate::error::NavigationError;
use crate::geometry::Coordinate;

/// ArduRover custom mode number for a mode name.
fn rover_mode(mode: &str) -> Option<u32> {
    match mode.to_uppercase().as_str() {
        "MANUAL" => Some(0),
        "ACRO" => Some(1),
        "STEERING" => Some(3),
        "HOLD" => Some(4),
        "LOITER" => Some(5),
        "AUTO" => Some(10),
        "RTL" => Some(11),
        "SMART_RTL" => Some(12),
        "GUIDED" => Some(15),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct LinkState {
    position: Option<Coordinate>,
    armed: bool,
    target_system: Option<u8>,
}

/// ArduPilot rover over MAVLink.
///
/// A reader thread keeps the last reported position and armed flag;
/// commands are written straight to the connection.
pub struct MavlinkVehicle {
    connection: Arc<dyn MavConnection<MavMessage> + Send + Sync>,
    state: Arc<RwLock<LinkState>>,
    running: Arc<AtomicBool>,
    sequence: AtomicU8,
    poll_interval: Duration,
}

impl MavlinkVehicle {
    pub fn connect(connection_string: &str, poll_interval: Duration) -> Result<Self> {
        info!("Connecting to vehicle on {}...", connection_string);
        let connection = mavlink::connect::<MavMessage>(connection_string)
            .with_context(|| format!("Failed to connect to vehicle on {}", connection_string))?;
        let connection: Arc<dyn MavConnection<MavMessage> + Send + Sync> = Arc::from(connection);

        let vehicle = Self {
            connection,
            state: Arc::new(RwLock::new(LinkState::default())),
            running: Arc::new(AtomicBool::new(true)),
            sequence: AtomicU8::new(0),
            poll_interval,
        };
        vehicle.spawn_reader();
        info!("Vehicle connected");
        Ok(vehicle)
    }

    /// MAVLink system id of the vehicle, once a heartbeat has been seen.
    pub fn system_id(&self) -> Option<u8> {
        self.state.read().ok().and_then(|s| s.target_system)
    }

    fn spawn_reader(&self) {
        let connection = self.connection.clone();
        let state = self.state.clone();
        let running = self.running.clone();

        std::thread::Builder::new()
            .name("mavlink-reader".to_string())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    match connection.recv() {
                        Ok((header, msg)) => Self::process_message(&state, header, msg),
                        Err(e) => {
                            debug!("MAVLink read error: {:?}", e);
                            std::thread::sleep(Duration::from_millis(10));
                        }
                    }
                }
                info!("MAVLink reader stopped");
            })
            .map(|_| ())
            .unwrap_or_else(|e| error!("Failed to spawn MAVLink reader: {}", e));
    }

    fn process_message(state: &RwLock<LinkState>, header: MavHeader, msg: MavMessage) {
        let Ok(mut state) = state.write() else {
            return;
        };
        match msg {
            MavMessage::HEARTBEAT(hb) => {
                state.armed =
                    (hb.base_mode.bits() & MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED.bits()) != 0;
                if state.target_system.is_none() {
                    info!("Vehicle heartbeat from system {}", header.system_id);
                    state.target_system = Some(header.system_id);
                }
            }
            MavMessage::GLOBAL_POSITION_INT(pos) => {
                state.position = Some(Coordinate::new(
                    pos.lat as f64 / 1e7,
                    pos.lon as f64 / 1e7,
                ));
            }
            _ => {}
        }
    }

    fn header(&self) -> MavHeader {
        MavHeader {
            system_id: 255,
            component_id: 0,
            sequence: self.sequence.fetch_add(1, Ordering::SeqCst),
        }
    }

    fn target_system(&self) -> u8 {
        self.system_id().unwrap_or(1)
    }

    fn is_armed(&self) -> bool {
        self.state.read().map(|s| s.armed).unwrap_or(false)
    }

    fn send(&self, msg: &MavMessage) -> Result<(), NavigationError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(NavigationError::Disconnected);
        }
        self.connection
            .send(&self.header(), msg)
            .map(|_| ())
            .map_err(|e| NavigationError::Link(e.to_string()))
    }

    fn send_command(&self, command: MavCmd, params: [f32; 7]) -> Result<(), NavigationError> {
        self.send(&MavMessage::COMMAND_LONG(COMMAND_LONG_DATA {
            target_system: self.target_system(),
            target_component: 1,
            command,
            confirmation: 0,
            param1: params[0],
            param2: params[1],
            param3: params[2],
            param4: params[3],
            param5: params[4],
            param6: params[5],
            param7: params[6],
        }))
    }

    fn set_mode(&self, mode: &str) -> Result<(), NavigationError> {
        let custom_mode = rover_mode(mode)
            .ok_or_else(|| NavigationError::Command(format!("unknown mode {}", mode)))?;
        // param1 = MAV_MODE_FLAG_CUSTOM_MODE_ENABLED
        self.send_command(
            MavCmd::MAV_CMD_DO_SET_MODE,
            [1.0, custom_mode as f32, 0.0, 0.0, 0.0, 0.0, 0.0],
        )
    }
}

#[async_trait]
impl VehicleDriver for MavlinkVehicle {
    async fn arm_and_set_mode(&self, mode: &str) -> Result<(), NavigationError> {
        info!("Arming the vehicle in {}...", mode);
        self.set_mode(mode)?;
        self.send_command(
            MavCmd::MAV_CMD_COMPONENT_ARM_DISARM,
            [1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
        )?;

        while !self.is_armed() {
            if !self.running.load(Ordering::SeqCst) {
                return Err(NavigationError::Disconnected);
            }
            info!("Waiting for vehicle to arm...");
            tokio::time::sleep(self.poll_interval).await;
        }
        info!("Vehicle armed");
        Ok(())
    }

    async fn goto(&self, target: Coordinate, altitude: f32) -> Result<(), NavigationError> {
        // position only
        let type_mask = PositionTargetTypemask::POSITION_TARGET_TYPEMASK_VX_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_VY_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_VZ_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_AX_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_AY_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_AZ_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_YAW_IGNORE
            | PositionTargetTypemask::POSITION_TARGET_TYPEMASK_YAW_RATE_IGNORE;

        self.send(&MavMessage::SET_POSITION_TARGET_GLOBAL_INT(
            SET_POSITION_TARGET_GLOBAL_INT_DATA {
                time_boot_ms: 0,
                target_system: self.target_system(),
                target_component: 1,
                coordinate_frame: MavFrame::MAV_FRAME_GLOBAL_RELATIVE_ALT_INT,
                type_mask,
                lat_int: (target.latitude * 1e7).round() as i32,
                lon_int: (target.longitude * 1e7).round() as i32,
                alt: altitude,
                vx: 0.0,
                vy: 0.0,
                vz: 0.0,
                afx: 0.0,
                afy: 0.0,
                afz: 0.0,
                yaw: 0.0,
                yaw_rate: 0.0,
            },
        ))
    }

    async fn position(&self) -> Result<Option<Coordinate>, NavigationError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(NavigationError::Disconnected);
        }
        self.state
            .read()
            .map(|s| s.position)
            .map_err(|e| NavigationError::Link(format!("Lock error: {}", e)))
    }

    async fn hold(&self) -> Result<(), NavigationError> {
        info!("Returning control, switching vehicle to HOLD");
        self.set_mode("HOLD")
    }

    async fn close(&self) -> Result<(), NavigationError> {
        if self.running.swap(false, Ordering::SeqCst) {
            info!("Closing vehicle connection");
        } else {
            warn!("Vehicle connection already closed");
        }
        Ok(())
    }
}
