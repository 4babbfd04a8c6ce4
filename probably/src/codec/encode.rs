// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

pub struct FilterBytes {
    bytes: Vec<u8>,
}

impl FilterBytes {
    /// Constructs an empty `FilterBytes` with at least the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// Consumes the `FilterBytes` and returns the underlying `Vec<u8>`.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn write(&mut self, buf: &[u8]) {
        self.bytes.extend_from_slice(buf);
    }

    /// Writes a 32-bit signed integer in big-endian byte order.
    pub fn write_i32_be(&mut self, n: i32) {
        self.write(&n.to_be_bytes());
    }

    /// Writes a 64-bit signed integer in big-endian byte order.
    pub fn write_i64_be(&mut self, n: i64) {
        self.write(&n.to_be_bytes());
    }

    /// Writes a 64-bit unsigned integer in big-endian byte order.
    pub fn write_u64_be(&mut self, n: u64) {
        self.write(&n.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::FilterBytes;
    use crate::codec::FilterSlice;

    #[test]
    fn test_big_endian_fields() {
        let mut bytes = FilterBytes::with_capacity(20);
        bytes.write_i32_be(1);
        bytes.write_i64_be(-2);
        bytes.write_u64_be(0xfafa_fafa_fafa_fafa);
        let bytes = bytes.into_bytes();
        assert_eq!(&bytes[..4], &[0, 0, 0, 1]);

        let mut slice = FilterSlice::new(&bytes);
        assert_eq!(slice.read_i32_be().unwrap(), 1);
        assert_eq!(slice.read_i64_be().unwrap(), -2);
        assert_eq!(slice.remaining(), 8);
        assert_eq!(slice.read_u64_be().unwrap(), 0xfafa_fafa_fafa_fafa);
        assert!(slice.read_i32_be().is_err());
    }
}
