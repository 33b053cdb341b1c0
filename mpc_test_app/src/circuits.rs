use mpc::{
    protocol::{CircuitBuilder, PublicWire},
    suite::ProtocolSuite,
};
use mpc_numeric::{divide, DivisionParams};

/// Party providing the dividend, which also learns the remainder.
pub const DIVIDEND_OWNER: usize = 0;
/// Party providing the divisor.
pub const DIVISOR_OWNER: usize = 1;

/// Check that operands fit into the bounds of `params`, so that the quotient is exact.
pub fn check_operands(dividend: u64, divisor: u64, params: &DivisionParams) -> Result<(), String> {
    if divisor == 0 {
        return Err("divisor must be positive".into());
    }
    if u64::BITS as usize - dividend.leading_zeros() as usize > params.dividend_bits {
        return Err(format!(
            "dividend {dividend} does not fit into {} bits",
            params.dividend_bits
        ));
    }
    if u64::BITS as usize - divisor.leading_zeros() as usize > params.divisor_bits {
        return Err(format!(
            "divisor {divisor} does not fit into {} bits",
            params.divisor_bits
        ));
    }
    Ok(())
}

pub struct DivisionWires {
    /// Quotient, opened to everyone.
    pub quotient: PublicWire,
    /// Remainder, revealed only to the dividend owner.
    pub remainder: PublicWire,
}

/// Division of a private dividend by a private divisor held by another party.
/// `dividend` and `divisor` are used only by their owners.
pub fn private_division<S: ProtocolSuite>(
    b: &mut CircuitBuilder<S>,
    dividend: Option<S::Field>,
    divisor: Option<S::Field>,
    params: DivisionParams,
) -> DivisionWires {
    let (x, d) = b.par(|b| (b.input(DIVIDEND_OWNER, dividend), b.input(DIVISOR_OWNER, divisor)));
    let (quotient, remainder) = divide(b, x, d, params);
    b.ensure_integrity();
    b.par(|b| DivisionWires {
        quotient: b.open(quotient),
        remainder: b.open_to(DIVIDEND_OWNER, remainder),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operands_within_default_bounds() {
        let params = DivisionParams::default();
        assert!(check_operands(313222110, 1110, &params).is_ok());
        assert!(check_operands(u32::MAX.into(), u16::MAX.into(), &params).is_ok());
    }

    #[test]
    fn test_operands_out_of_bounds() {
        let params = DivisionParams::default();
        assert!(check_operands(5, 0, &params).is_err());
        assert!(check_operands(1 << 32, 3, &params).is_err());
        assert!(check_operands(100, 1 << 16, &params).is_err());
    }
}
