//! Concrete message types.

use super::{Message, MessageError, MessageType, PayloadReader, PayloadWriter};

/// Number of samples in one HX711 batch
pub const HX711_SAMPLES: usize = 10;

/// Number of raw channels in one ADS1115 reading
pub const ADS1115_CHANNELS: usize = 5;

/// Log line forwarded from a remote node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteLog<'a> {
    /// Milliseconds since boot on the sender
    pub timestamp: u32,
    /// Log text
    pub message: &'a str,
}

impl<'a> Message<'a> for RemoteLog<'a> {
    const TYPE: MessageType = MessageType::RemoteLog;

    fn encode_fields(&self, w: &mut PayloadWriter<'_>) -> Result<(), MessageError> {
        w.write_u32(self.timestamp)?;
        w.write_str(self.message)
    }

    fn decode_fields(r: &mut PayloadReader<'a>) -> Result<Self, MessageError> {
        Ok(Self {
            timestamp: r.read_u32()?,
            message: r.read_str()?,
        })
    }
}

/// System state report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemState {
    /// Application-defined state id
    pub state_id: u8,
    /// Whether the state is active
    pub is_active: bool,
    /// Uptime in milliseconds
    pub uptime_ms: u32,
}

impl<'a> Message<'a> for SystemState {
    const TYPE: MessageType = MessageType::SystemState;

    fn encode_fields(&self, w: &mut PayloadWriter<'_>) -> Result<(), MessageError> {
        w.write_u8(self.state_id)?;
        w.write_bool(self.is_active)?;
        w.write_u32(self.uptime_ms)
    }

    fn decode_fields(r: &mut PayloadReader<'a>) -> Result<Self, MessageError> {
        Ok(Self {
            state_id: r.read_u8()?,
            is_active: r.read_bool()?,
            uptime_ms: r.read_u32()?,
        })
    }
}

/// HX711 load-cell sample batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorHx711 {
    /// Timestamp of the first sample
    pub timestamp: u32,
    /// Raw 24-bit samples, zero-extended
    pub samples: [u32; HX711_SAMPLES],
}

impl<'a> Message<'a> for SensorHx711 {
    const TYPE: MessageType = MessageType::SensorHx711;

    fn encode_fields(&self, w: &mut PayloadWriter<'_>) -> Result<(), MessageError> {
        w.write_u32(self.timestamp)?;
        self.samples.iter().try_for_each(|s| w.write_u32(*s))
    }

    fn decode_fields(r: &mut PayloadReader<'a>) -> Result<Self, MessageError> {
        let timestamp = r.read_u32()?;
        let mut samples = [0u32; HX711_SAMPLES];
        for sample in &mut samples {
            *sample = r.read_u32()?;
        }
        Ok(Self { timestamp, samples })
    }
}

/// ADS1115 ADC readings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorAds1115 {
    /// Timestamp of the reading
    pub timestamp: u32,
    /// Converted channel values
    pub raw: [f32; ADS1115_CHANNELS],
}

impl<'a> Message<'a> for SensorAds1115 {
    const TYPE: MessageType = MessageType::SensorAds1115;

    fn encode_fields(&self, w: &mut PayloadWriter<'_>) -> Result<(), MessageError> {
        w.write_u32(self.timestamp)?;
        self.raw.iter().try_for_each(|v| w.write_f32(*v))
    }

    fn decode_fields(r: &mut PayloadReader<'a>) -> Result<Self, MessageError> {
        let timestamp = r.read_u32()?;
        let mut raw = [0f32; ADS1115_CHANNELS];
        for value in &mut raw {
            *value = r.read_f32()?;
        }
        Ok(Self { timestamp, raw })
    }
}
