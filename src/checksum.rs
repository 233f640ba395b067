use once_cell::sync::Lazy;

/// CRC-32 lookup table for the reversed polynomial 0xEDB88320, built once.
static CRC_TABLE: Lazy<[u32; 256]> = Lazy::new(|| {
    let mut table = [0u32; 256];
    for (i, entry) in table.iter_mut().enumerate() {
        let mut c = i as u32;
        for _ in 0..8 {
            c = if c & 1 != 0 {
                0xEDB8_8320 ^ (c >> 1)
            } else {
                c >> 1
            };
        }
        *entry = c;
    }
    table
});

/// Streaming CRC-32 (initial 0xFFFFFFFF, final XOR 0xFFFFFFFF, LSB-first).
pub struct Crc32 {
    value: u32,
}

impl Crc32 {
    pub fn new() -> Self {
        Crc32 { value: 0xFFFF_FFFF }
    }

    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            let index = ((self.value ^ byte as u32) & 0xFF) as usize;
            self.value = (self.value >> 8) ^ CRC_TABLE[index];
        }
    }

    pub fn finalize(self) -> u32 {
        self.value ^ 0xFFFF_FFFF
    }

    pub fn of(data: &[u8]) -> u32 {
        let mut crc = Crc32::new();
        crc.update(data);
        crc.finalize()
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Crc32::new()
    }
}

const ADLER_MOD: u32 = 65521;

/// Streaming Adler-32 (a=1, b=0; result (b<<16)|a).
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Adler32 {
    pub fn new() -> Self {
        Adler32 { a: 1, b: 0 }
    }

    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.a = (self.a + byte as u32) % ADLER_MOD;
            self.b = (self.b + self.a) % ADLER_MOD;
        }
    }

    pub fn finalize(self) -> u32 {
        (self.b << 16) | self.a
    }

    pub fn of(data: &[u8]) -> u32 {
        let mut adler = Adler32::new();
        adler.update(data);
        adler.finalize()
    }
}

impl Default for Adler32 {
    fn default() -> Self {
        Adler32::new()
    }
}
