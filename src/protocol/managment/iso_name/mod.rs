//! 64-bit J1939 NAME, as carried in the Address Claimed message (PGN 60928).
//! A NAME identifies one controller application independently of the source
//! address it currently holds.
//!
//! # Bit layout (transmitted little endian)
//!
//! ```text
//! Bits  0-20  (21 bits) : Identity number
//! Bits 21-31  (11 bits) : Manufacturer code
//! Bits 32-34  ( 3 bits) : ECU instance
//! Bits 35-39  ( 5 bits) : Function instance
//! Bits 40-47  ( 8 bits) : Function
//! Bit  48     ( 1 bit ) : Reserved
//! Bits 49-55  ( 7 bits) : Vehicle system
//! Bits 56-59  ( 4 bits) : Vehicle system instance
//! Bits 60-62  ( 3 bits) : Industry group
//! Bit  63     ( 1 bit ) : Arbitrary Address Capable
//! ```
use core::fmt;

const IDENTITY_MASK: u64 = 0x1F_FFFF;
const MANUFACTURER_SHIFT: u32 = 21;
const MANUFACTURER_MASK: u64 = 0x7FF;
const ECU_INSTANCE_SHIFT: u32 = 32;
const FUNCTION_INSTANCE_SHIFT: u32 = 35;
const FUNCTION_SHIFT: u32 = 40;
const VEHICLE_SYSTEM_SHIFT: u32 = 49;
const VEHICLE_SYSTEM_INSTANCE_SHIFT: u32 = 56;
const INDUSTRY_GROUP_SHIFT: u32 = 60;
const AAC_SHIFT: u32 = 63;

/// J1939 NAME. Ordering follows the raw value: during address arbitration
/// the numerically lower NAME wins.
///
/// # Example
///
/// ```
/// use korri_j1939::protocol::managment::iso_name::IsoName;
///
/// let name = IsoName::builder()
///     .identity_number(0x1234)
///     .manufacturer_code(0x2A)
///     .industry_group(0)
///     .arbitrary_address_capable(true)
///     .build();
///
/// assert_eq!(name.identity_number(), 0x1234);
/// assert_eq!(IsoName::from_le_bytes(name.to_le_bytes()), name);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IsoName(u64);

impl IsoName {
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn builder() -> IsoNameBuilder {
        IsoNameBuilder::new()
    }

    #[inline]
    pub const fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }

    #[inline]
    pub const fn to_le_bytes(&self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// Extract the NAME from an Address Claimed payload. Claims shorter than
    /// eight bytes are malformed and yield `None`.
    pub fn from_claim_payload(payload: &[u8]) -> Option<Self> {
        let bytes: [u8; 8] = payload.get(..8)?.try_into().ok()?;
        Some(Self::from_le_bytes(bytes))
    }

    #[inline]
    pub const fn identity_number(&self) -> u32 {
        (self.0 & IDENTITY_MASK) as u32
    }

    #[inline]
    pub const fn manufacturer_code(&self) -> u16 {
        ((self.0 >> MANUFACTURER_SHIFT) & MANUFACTURER_MASK) as u16
    }

    #[inline]
    pub const fn ecu_instance(&self) -> u8 {
        ((self.0 >> ECU_INSTANCE_SHIFT) & 0x07) as u8
    }

    #[inline]
    pub const fn function_instance(&self) -> u8 {
        ((self.0 >> FUNCTION_INSTANCE_SHIFT) & 0x1F) as u8
    }

    #[inline]
    pub const fn function(&self) -> u8 {
        ((self.0 >> FUNCTION_SHIFT) & 0xFF) as u8
    }

    #[inline]
    pub const fn vehicle_system(&self) -> u8 {
        ((self.0 >> VEHICLE_SYSTEM_SHIFT) & 0x7F) as u8
    }

    #[inline]
    pub const fn vehicle_system_instance(&self) -> u8 {
        ((self.0 >> VEHICLE_SYSTEM_INSTANCE_SHIFT) & 0x0F) as u8
    }

    /// Industry group (0 global, 1 on-highway, 2 agricultural, ...).
    #[inline]
    pub const fn industry_group(&self) -> u8 {
        ((self.0 >> INDUSTRY_GROUP_SHIFT) & 0x07) as u8
    }

    /// Whether the controller may claim an address from the dynamic range.
    #[inline]
    pub const fn is_arbitrary_address_capable(&self) -> bool {
        (self.0 >> AAC_SHIFT) & 0x01 != 0
    }
}

impl From<u64> for IsoName {
    #[inline]
    fn from(raw: u64) -> Self {
        Self::from_raw(raw)
    }
}

impl From<IsoName> for u64 {
    #[inline]
    fn from(name: IsoName) -> Self {
        name.raw()
    }
}

/// Sixteen upper-case hex digits, the form NAMEs are usually logged in.
impl fmt::Display for IsoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016X}", self.0)
    }
}

/// Fluent builder for [`IsoName`]. Values wider than their field are masked.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsoNameBuilder {
    raw: u64,
}

impl IsoNameBuilder {
    #[inline]
    pub const fn new() -> Self {
        Self { raw: 0 }
    }

    #[inline]
    const fn field(mut self, shift: u32, mask: u64, value: u64) -> Self {
        self.raw = (self.raw & !(mask << shift)) | ((value & mask) << shift);
        self
    }

    #[inline]
    pub const fn identity_number(self, value: u32) -> Self {
        self.field(0, IDENTITY_MASK, value as u64)
    }

    #[inline]
    pub const fn manufacturer_code(self, value: u16) -> Self {
        self.field(MANUFACTURER_SHIFT, MANUFACTURER_MASK, value as u64)
    }

    #[inline]
    pub const fn ecu_instance(self, value: u8) -> Self {
        self.field(ECU_INSTANCE_SHIFT, 0x07, value as u64)
    }

    #[inline]
    pub const fn function_instance(self, value: u8) -> Self {
        self.field(FUNCTION_INSTANCE_SHIFT, 0x1F, value as u64)
    }

    #[inline]
    pub const fn function(self, value: u8) -> Self {
        self.field(FUNCTION_SHIFT, 0xFF, value as u64)
    }

    #[inline]
    pub const fn vehicle_system(self, value: u8) -> Self {
        self.field(VEHICLE_SYSTEM_SHIFT, 0x7F, value as u64)
    }

    #[inline]
    pub const fn vehicle_system_instance(self, value: u8) -> Self {
        self.field(VEHICLE_SYSTEM_INSTANCE_SHIFT, 0x0F, value as u64)
    }

    #[inline]
    pub const fn industry_group(self, value: u8) -> Self {
        self.field(INDUSTRY_GROUP_SHIFT, 0x07, value as u64)
    }

    #[inline]
    pub const fn arbitrary_address_capable(self, value: bool) -> Self {
        self.field(AAC_SHIFT, 0x01, value as u64)
    }

    #[inline]
    pub const fn build(self) -> IsoName {
        IsoName(self.raw)
    }
}
