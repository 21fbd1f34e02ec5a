// Copyright (c) Facebook, Inc. and its affiliates.
//
// This source code is licensed under the MIT license found in the
// LICENSE file in the root directory of this source tree.

use crate::curve::CurveTrait;

/// Hex encoding of a point, for log output.
pub(crate) fn point_hex<C: CurveTrait>(point: &C) -> String {
    hex::encode(point.to_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{curve::Secp256k1, curve::ScalarTrait, utils::testing::init_testing};

    #[test]
    fn point_hex_is_compressed_sec1() {
        let mut rng = init_testing();
        let p = Secp256k1::scale_generator(&<Secp256k1 as CurveTrait>::Scalar::random(&mut rng));
        let encoded = point_hex(&p);
        assert_eq!(encoded.len(), 66);
        assert!(encoded.starts_with("02") || encoded.starts_with("03"));
    }
}

////////////////////////////
// Test Utility Functions //
////////////////////////////
