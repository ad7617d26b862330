//! Passive map of source addresses to the NAMEs that claimed them, learnt from
//! Address Claimed (PGN 60928) traffic. Used to tag decoded messages with the
//! NAME of their source and destination.
//!
//! - A claim from address 0-253 binds that address to the claimed NAME. A
//!   NAME showing up at a new address releases its previous address.
//! - A "Cannot Claim Address" (source 254) releases whatever address the NAME
//!   held.
use alloc::collections::BTreeMap;

use crate::protocol::managment::iso_name::IsoName;
use crate::protocol::transport::{GLOBAL_ADDRESS, NULL_ADDRESS, PGN_ADDRESS_CLAIM};

/// Outcome of feeding a claim to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClaimUpdate {
    /// The address already belonged to this NAME.
    Unchanged,
    /// `address` is now held by `name`; `previous` held it before.
    Claimed {
        address: u8,
        name: IsoName,
        previous: Option<IsoName>,
    },
    /// `name` could not claim an address and lost the one it had, if any.
    Released { name: IsoName, address: Option<u8> },
    /// Not a valid Address Claimed message.
    Ignored,
}

#[derive(Debug, Clone, Default)]
pub struct AddressTable {
    entries: BTreeMap<u8, IsoName>,
}

impl AddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a decoded message. Only PGN 60928 with an eight-byte payload is
    /// considered.
    pub fn observe(&mut self, pgn: u32, source_address: u8, payload: &[u8]) -> ClaimUpdate {
        if pgn != PGN_ADDRESS_CLAIM || source_address == GLOBAL_ADDRESS {
            return ClaimUpdate::Ignored;
        }
        let Some(name) = IsoName::from_claim_payload(payload) else {
            return ClaimUpdate::Ignored;
        };

        let held = self.address_of(name);

        if source_address == NULL_ADDRESS {
            if let Some(address) = held {
                self.entries.remove(&address);
            }
            return ClaimUpdate::Released {
                name,
                address: held,
            };
        }

        if held == Some(source_address) {
            return ClaimUpdate::Unchanged;
        }
        if let Some(address) = held {
            self.entries.remove(&address);
        }
        let previous = self.entries.insert(source_address, name);

        #[cfg(feature = "defmt")]
        defmt::debug!("Address {=u8:#X} claimed by NAME {=u64:#X}", source_address, name.raw());

        ClaimUpdate::Claimed {
            address: source_address,
            name,
            previous,
        }
    }

    pub fn name_of(&self, address: u8) -> Option<IsoName> {
        self.entries.get(&address).copied()
    }

    pub fn address_of(&self, name: IsoName) -> Option<u8> {
        self.entries
            .iter()
            .find(|(_, n)| **n == name)
            .map(|(address, _)| *address)
    }

    /// Known (address, NAME) pairs in address order.
    pub fn iter(&self) -> impl Iterator<Item = (u8, IsoName)> + '_ {
        self.entries.iter().map(|(address, name)| (*address, *name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
