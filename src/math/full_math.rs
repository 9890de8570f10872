// src/math/full_math.rs

use uint::construct_uint;

construct_uint! { pub struct U256(4); }
construct_uint! { pub struct U512(8); }

/// Multiplication puis division sur une largeur double, comme `FullMath.mulDiv` on-chain.
/// Retourne `None` si le dénominateur est nul ou si le résultat ne tient pas dans `Self`.
pub trait MulDiv<RHS = Self> {
    type Output;
    fn mul_div_floor(self, num: RHS, denom: RHS) -> Option<Self::Output>;
    fn mul_div_ceil(self, num: RHS, denom: RHS) -> Option<Self::Output>;
}

trait Upcast<T> { fn as_up(self) -> T; }
trait Downcast<T> { fn as_down(self) -> T; }

impl Upcast<U512> for U256 {
    fn as_up(self) -> U512 { U512([self.0[0], self.0[1], self.0[2], self.0[3], 0, 0, 0, 0]) }
}
impl Downcast<U256> for U512 {
    fn as_down(self) -> U256 { U256([self.0[0], self.0[1], self.0[2], self.0[3]]) }
}

impl MulDiv for U256 {
    type Output = U256;

    fn mul_div_floor(self, num: Self, denom: Self) -> Option<Self::Output> {
        if denom.is_zero() { return None; }
        let r = (self.as_up() * num.as_up()) / denom.as_up();
        if r > U256::MAX.as_up() { None } else { Some(r.as_down()) }
    }

    fn mul_div_ceil(self, num: Self, denom: Self) -> Option<Self::Output> {
        if denom.is_zero() { return None; }
        let r = (self.as_up() * num.as_up() + (denom - U256::one()).as_up()) / denom.as_up();
        if r > U256::MAX.as_up() { None } else { Some(r.as_down()) }
    }
}

/// (Dé)sérialisation d'un `U256` en chaîne décimale, format des snapshots JSON.
pub mod u256_dec {
    use super::U256;
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(deserializer)?;
        U256::from_dec_str(&raw).map_err(|e| D::Error::custom(format!("montant invalide '{}': {:?}", raw, e)))
    }
}
