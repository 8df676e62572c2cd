use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use zoneflow_cloud::{
    ClientError, ClientResult, ZoneClient, ZoneDescriptor, ZonePatch, ZoneSpec,
};

pub const ZONE_ID: &str = "z1";

/// In-memory zone backend with scripted refresh results
///
/// Reads answer from the script in order; the last entry repeats. With an
/// empty script reads report ACTIVE.
#[derive(Default)]
pub struct FakeZoneClient {
    zone: Mutex<Option<ZoneDescriptor>>,
    script: Mutex<VecDeque<ClientResult<&'static str>>>,
    create_error: Mutex<Option<ClientError>>,
    update_error: Mutex<Option<ClientError>>,
    delete_error: Mutex<Option<ClientError>>,
    creates: AtomicU32,
    reads: AtomicU32,
    updates: AtomicU32,
    deletes: AtomicU32,
}

#[allow(dead_code)]
impl FakeZoneClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing zone
    pub fn with_zone(self, zone: ZoneDescriptor) -> Self {
        *self.zone.lock().unwrap() = Some(zone);
        self
    }

    pub fn with_reads(self, script: Vec<ClientResult<&'static str>>) -> Self {
        *self.script.lock().unwrap() = script.into();
        self
    }

    pub fn failing_create(self, error: ClientError) -> Self {
        *self.create_error.lock().unwrap() = Some(error);
        self
    }

    pub fn failing_update(self, error: ClientError) -> Self {
        *self.update_error.lock().unwrap() = Some(error);
        self
    }

    pub fn failing_delete(self, error: ClientError) -> Self {
        *self.delete_error.lock().unwrap() = Some(error);
        self
    }

    pub fn creates(&self) -> u32 {
        self.creates.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> u32 {
        self.updates.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> u32 {
        self.deletes.load(Ordering::SeqCst)
    }

    fn next_status(&self) -> ClientResult<&'static str> {
        let mut script = self.script.lock().unwrap();
        match script.len() {
            0 => Ok("ACTIVE"),
            1 => script.front().cloned().unwrap(),
            _ => script.pop_front().unwrap(),
        }
    }
}

#[async_trait]
impl ZoneClient for FakeZoneClient {
    async fn create(&self, spec: &ZoneSpec) -> ClientResult<ZoneDescriptor> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.create_error.lock().unwrap().clone() {
            return Err(error);
        }
        let zone = ZoneDescriptor::from_spec(ZONE_ID, spec).with_status("PENDING");
        *self.zone.lock().unwrap() = Some(zone.clone());
        Ok(zone)
    }

    async fn read(&self, id: &str) -> ClientResult<ZoneDescriptor> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let status = self.next_status()?;
        self.zone
            .lock()
            .unwrap()
            .clone()
            .filter(|zone| zone.id == id)
            .map(|zone| zone.with_status(status))
            .ok_or_else(|| ClientError::not_found(format!("zone {} not found", id)))
    }

    async fn update(&self, id: &str, patch: &ZonePatch) -> ClientResult<ZoneDescriptor> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.update_error.lock().unwrap().clone() {
            return Err(error);
        }
        let mut guard = self.zone.lock().unwrap();
        let zone = guard
            .as_mut()
            .filter(|zone| zone.id == id)
            .ok_or_else(|| ClientError::not_found(format!("zone {} not found", id)))?;
        patch.apply_to(zone);
        zone.status = "PENDING".to_string();
        Ok(zone.clone())
    }

    async fn delete(&self, id: &str) -> ClientResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = self.delete_error.lock().unwrap().clone() {
            return Err(error);
        }
        match self.zone.lock().unwrap().as_ref() {
            Some(zone) if zone.id == id => Ok(()),
            _ => Err(ClientError::not_found(format!("zone {} not found", id))),
        }
    }
}
