use crate::{MpcError, MpcShare};

/// Handle of a shared value computed by some gate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SecretWire(pub(crate) usize);

/// Handle of a public value computed by some gate.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PublicWire(pub(crate) usize);

/// Value of a public wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PublicSlot<F> {
    Pending,
    Known(F),
    /// Value revealed to a different party only.
    Withheld,
}

/// Write-once storage of wire values.
pub struct WireStore<T: MpcShare> {
    secrets: Vec<Option<T>>,
    publics: Vec<PublicSlot<T::Field>>,
}

impl<T: MpcShare> WireStore<T> {
    /// Create storage with all wires unset.
    pub fn new(num_secret_wires: usize, num_public_wires: usize) -> Self {
        Self {
            secrets: vec![None; num_secret_wires],
            publics: vec![PublicSlot::Pending; num_public_wires],
        }
    }

    pub fn secret(&self, wire: SecretWire) -> Result<T, MpcError> {
        self.secrets[wire.0].ok_or(MpcError::UnresolvedWire(wire.0))
    }

    pub fn secrets(&self, wires: &[SecretWire]) -> Result<Vec<T>, MpcError> {
        wires.iter().map(|&wire| self.secret(wire)).collect()
    }

    pub fn public(&self, wire: PublicWire) -> Result<T::Field, MpcError> {
        match self.publics[wire.0] {
            PublicSlot::Known(value) => Ok(value),
            PublicSlot::Pending => Err(MpcError::UnresolvedWire(wire.0)),
            PublicSlot::Withheld => Err(MpcError::WithheldValue(wire.0)),
        }
    }

    pub fn publics(&self, wires: &[PublicWire]) -> Result<Vec<T::Field>, MpcError> {
        wires.iter().map(|&wire| self.public(wire)).collect()
    }

    pub fn set_secret(&mut self, wire: SecretWire, value: T) {
        let slot = &mut self.secrets[wire.0];
        if slot.is_some() {
            panic!("Secret wire {} assigned twice", wire.0);
        }
        *slot = Some(value);
    }

    pub fn set_public(&mut self, wire: PublicWire, value: Option<T::Field>) {
        let slot = &mut self.publics[wire.0];
        if !matches!(slot, PublicSlot::Pending) {
            panic!("Public wire {} assigned twice", wire.0);
        }
        *slot = match value {
            Some(value) => PublicSlot::Known(value),
            None => PublicSlot::Withheld,
        };
    }

    /// Release public values of finished computation.
    pub fn into_outputs(self) -> MpcOutputs<T::Field> {
        MpcOutputs {
            publics: self.publics,
        }
    }
}

/// Public values of a verified computation.
#[derive(Clone, Debug)]
pub struct MpcOutputs<F> {
    publics: Vec<PublicSlot<F>>,
}

impl<F: Copy> MpcOutputs<F> {
    /// Value of public wire, or None if it was revealed to a different party.
    pub fn get(&self, wire: PublicWire) -> Option<F> {
        match self.publics[wire.0] {
            PublicSlot::Known(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_all(&self, wires: &[PublicWire]) -> Vec<Option<F>> {
        wires.iter().map(|&wire| self.get(wire)).collect()
    }
}
