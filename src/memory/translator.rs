//! Address translation: hex address strings to tag, set index and offset

use log::debug;

use crate::error::AddressError;
use crate::error::GeometryError;

pub fn get_log_2(value: usize) -> usize {
    assert!(value > 0);
    (usize::BITS - 1 - value.leading_zeros()) as usize
}

pub fn is_pow_2(value: usize) -> bool {
    value != 0 && value & (value - 1) == 0
}

pub fn get_mask(bits: usize) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1 << bits) - 1
    }
}

/// Shape of one cache level
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CacheGeometry {
    pub total_size: usize,
    pub block_size: usize,
    pub address_bits: usize,
    pub num_sets: usize,
    pub blocks_per_set: usize,
}

impl CacheGeometry {
    pub fn make(
        total_size: usize,
        block_size: usize,
        address_bits: usize,
        num_sets: usize,
        blocks_per_set: usize,
    ) -> Self {
        Self {
            total_size,
            block_size,
            address_bits,
            num_sets,
            blocks_per_set,
        }
    }

    /// Checks every invariant of the geometry and returns
    /// the (offset, index, tag) bit widths on success
    pub fn validate(&self) -> Result<(usize, usize, usize), GeometryError> {
        for (name, value) in [
            ("total_size", self.total_size),
            ("block_size", self.block_size),
            ("num_sets", self.num_sets),
            ("blocks_per_set", self.blocks_per_set),
        ] {
            if value == 0 {
                return Err(GeometryError::ZeroField(name));
            }
        }
        if self.block_size > self.total_size {
            return Err(GeometryError::BlockLargerThanCache {
                block_size: self.block_size,
                total_size: self.total_size,
            });
        }
        if self.total_size % self.block_size != 0 {
            return Err(GeometryError::SizeNotMultipleOfBlock {
                block_size: self.block_size,
                total_size: self.total_size,
            });
        }
        let product = self
            .blocks_per_set
            .checked_mul(self.block_size)
            .and_then(|v| v.checked_mul(self.num_sets));
        if product != Some(self.total_size) {
            return Err(GeometryError::Inconsistent {
                blocks_per_set: self.blocks_per_set,
                block_size: self.block_size,
                num_sets: self.num_sets,
                total_size: self.total_size,
            });
        }
        if !is_pow_2(self.block_size) {
            return Err(GeometryError::NotPowerOfTwo {
                name: "block_size",
                value: self.block_size,
            });
        }
        if !is_pow_2(self.num_sets) {
            return Err(GeometryError::NotPowerOfTwo {
                name: "num_sets",
                value: self.num_sets,
            });
        }
        if self.address_bits == 0 || self.address_bits > 64 {
            return Err(GeometryError::AddressWidth(self.address_bits));
        }

        let offset_bits = get_log_2(self.block_size);
        let index_bits = get_log_2(self.num_sets);
        if offset_bits + index_bits >= self.address_bits {
            return Err(GeometryError::NoTagBits {
                address_bits: self.address_bits,
                offset_bits,
                index_bits,
            });
        }
        let tag_bits = self.address_bits - offset_bits - index_bits;

        Ok((offset_bits, index_bits, tag_bits))
    }
}

/// An address split into its cache fields
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedAddress {
    pub tag: u64,
    pub set_index: u64,
    pub offset: u64,
}

/// Translates hex addresses according to a validated geometry.
// Address layout, most significant bit first:
// | tag | index | offset |
#[derive(Debug)]
pub struct AddressTranslator {
    geometry: CacheGeometry,
    debug: bool,

    offset_bits: usize,
    index_bits: usize,
    tag_bits: usize,

    offset_mask: u64,
    index_mask: u64,
}

impl AddressTranslator {
    pub fn make(
        geometry: CacheGeometry,
        debug: bool,
    ) -> Result<Self, GeometryError> {
        if debug {
            debug!(
                "address translator: cache size = {}B, block size = {}B, address size = {}-bit",
                geometry.total_size, geometry.block_size, geometry.address_bits
            );
        }

        let (offset_bits, index_bits, tag_bits) =
            geometry.validate().inspect_err(|e| {
                if debug {
                    debug!("address translator: {}", e);
                }
            })?;

        if debug {
            debug!(
                "offset bits: {}, index bits: {}, tag bits: {}",
                offset_bits, index_bits, tag_bits
            );
        }

        Ok(Self {
            geometry,
            debug,
            offset_bits,
            index_bits,
            tag_bits,
            offset_mask: get_mask(offset_bits),
            index_mask: get_mask(index_bits),
        })
    }

    pub fn geometry(&self) -> &CacheGeometry {
        &self.geometry
    }

    pub fn offset_bits(&self) -> usize {
        self.offset_bits
    }

    pub fn index_bits(&self) -> usize {
        self.index_bits
    }

    pub fn tag_bits(&self) -> usize {
        self.tag_bits
    }

    /// Translate a hex address with an optional `0x`/`0X` prefix.
    /// Missing leading digits are taken as zero
    pub fn translate(&self, address: &str) -> Result<DecodedAddress, AddressError> {
        if self.debug {
            debug!("translating: {}", address);
        }

        let digits = address
            .strip_prefix("0x")
            .or_else(|| address.strip_prefix("0X"))
            .unwrap_or(address);

        let provided_bits = digits.len() * 4;
        if provided_bits > self.geometry.address_bits {
            return Err(AddressError::SizeMismatch {
                address: address.to_string(),
                provided_bits,
                address_bits: self.geometry.address_bits,
            });
        }
        if digits.is_empty() {
            return Err(AddressError::Malformed {
                address: address.to_string(),
                reason: "no hex digits".to_string(),
            });
        }

        let mut value: u64 = 0;
        for ch in digits.chars() {
            let nibble = ch.to_digit(16).ok_or_else(|| AddressError::Malformed {
                address: address.to_string(),
                reason: format!("'{}' is not a hex digit", ch),
            })?;
            // At most 16 digits reach this point, so nothing is shifted out
            value = (value << 4) | nibble as u64;
        }

        let decoded = DecodedAddress {
            tag: value >> (self.offset_bits + self.index_bits),
            set_index: (value >> self.offset_bits) & self.index_mask,
            offset: value & self.offset_mask,
        };

        if self.debug {
            debug!(
                "tag: {}, index: {}, offset: {}",
                decoded.tag, decoded.set_index, decoded.offset
            );
        }

        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translator(
        total_size: usize,
        block_size: usize,
        address_bits: usize,
        num_sets: usize,
        blocks_per_set: usize,
    ) -> Result<AddressTranslator, GeometryError> {
        AddressTranslator::make(
            CacheGeometry::make(
                total_size,
                block_size,
                address_bits,
                num_sets,
                blocks_per_set,
            ),
            false,
        )
    }

    #[test]
    fn test_get_log_2() {
        for n in 1..123456 {
            let expected = {
                let mut count = 0;
                let mut t = n;
                while t > 1 {
                    count += 1;
                    t >>= 1;
                }
                count
            };
            assert_eq!(expected, get_log_2(n));
        }
    }

    #[test]
    fn test_bit_widths_cover_address() {
        for &(total, block, sets, bps) in &[
            (1024, 32, 32, 1),
            (1024, 32, 16, 2),
            (1024, 32, 4, 8),
            (16384, 128, 64, 2),
            (64, 64, 1, 1),
        ] {
            let at = translator(total, block, 32, sets, bps).unwrap();
            assert!(at.tag_bits() > 0);
            assert_eq!(at.offset_bits() + at.index_bits() + at.tag_bits(), 32);
        }
    }

    #[test]
    fn test_extremes() {
        let at = translator(256, 32, 32, 4, 2).unwrap();
        assert_eq!(
            at.translate("0x00000000").unwrap(),
            DecodedAddress { tag: 0, set_index: 0, offset: 0 }
        );
        assert_eq!(
            at.translate("0xFFFFFFFF").unwrap(),
            DecodedAddress { tag: (1 << 25) - 1, set_index: 3, offset: 31 }
        );
    }

    #[test]
    fn test_prefix_case_and_padding() {
        let at = translator(256, 32, 32, 4, 2).unwrap();
        let expected = at.translate("0x000000e5").unwrap();
        assert_eq!(at.translate("0XE5").unwrap(), expected);
        assert_eq!(at.translate("e5").unwrap(), expected);
        // 0xe5 = 0b111_00101
        assert_eq!(expected, DecodedAddress { tag: 1, set_index: 3, offset: 5 });
    }

    #[test]
    fn test_translate_is_deterministic() {
        let at = translator(1024, 32, 32, 16, 2).unwrap();
        let first = at.translate("0x7ffd3c18").unwrap();
        for _ in 0..10 {
            assert_eq!(at.translate("0x7ffd3c18").unwrap(), first);
        }
    }

    #[test]
    fn test_address_too_wide() {
        let at = translator(1024, 32, 16, 32, 1).unwrap();
        assert!(at.translate("0xffff").is_ok());
        assert!(matches!(
            at.translate("0x10000"),
            Err(AddressError::SizeMismatch { provided_bits: 20, address_bits: 16, .. })
        ));
    }

    #[test]
    fn test_malformed_address() {
        let at = translator(1024, 32, 32, 32, 1).unwrap();
        assert!(matches!(at.translate("0x12g4"), Err(AddressError::Malformed { .. })));
        assert!(matches!(at.translate("+123"), Err(AddressError::Malformed { .. })));
        assert!(matches!(at.translate("0x"), Err(AddressError::Malformed { .. })));
    }

    #[test]
    fn test_invalid_geometries() {
        assert!(matches!(
            translator(32, 64, 32, 1, 1),
            Err(GeometryError::BlockLargerThanCache { .. })
        ));
        assert!(matches!(
            translator(1000, 32, 32, 1, 1),
            Err(GeometryError::SizeNotMultipleOfBlock { .. })
        ));
        assert!(matches!(
            translator(1024, 32, 32, 8, 2),
            Err(GeometryError::Inconsistent { .. })
        ));
        assert!(matches!(
            translator(1152, 32, 32, 12, 3),
            Err(GeometryError::NotPowerOfTwo { name: "num_sets", .. })
        ));
        assert!(matches!(
            translator(1024, 32, 10, 32, 1),
            Err(GeometryError::NoTagBits { .. })
        ));
        assert!(matches!(
            translator(1024, 32, 0, 32, 1),
            Err(GeometryError::AddressWidth(0))
        ));
        assert_eq!(
            translator(1024, 32, 32, 0, 1).unwrap_err(),
            GeometryError::ZeroField("num_sets")
        );
    }
}
