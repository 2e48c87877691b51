//! The builtin driver set.

use ember_core::traits::Driver;

/// Names and descriptions of the drivers registered at every startup, in
/// registration order.
pub const BUILTIN_DRIVERS: [(&str, &str); 6] = [
    ("efile", "file access"),
    ("ram_file_drv", "in-memory files"),
    ("tcp_inet", "TCP sockets"),
    ("inet_gethost", "host name resolution"),
    ("zlib_drv", "zlib compression"),
    ("js", "script host bridge"),
];

/// Registry entry for a driver whose port implementation is provided by
/// the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinDriver {
    name: &'static str,
    description: &'static str,
}

impl BuiltinDriver {
    /// Create a builtin driver entry.
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self { name, description }
    }

    /// What the driver provides.
    pub fn description(&self) -> &'static str {
        self.description
    }
}

impl Driver for BuiltinDriver {
    fn name(&self) -> &str {
        self.name
    }
}

/// Fresh instances of the builtin drivers.
pub fn builtin_drivers() -> Vec<Box<dyn Driver>> {
    BUILTIN_DRIVERS
        .iter()
        .map(|&(name, description)| Box::new(BuiltinDriver::new(name, description)) as Box<dyn Driver>)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_order() {
        let names: Vec<String> = builtin_drivers().iter().map(|d| d.name().to_string()).collect();
        assert_eq!(
            names,
            vec!["efile", "ram_file_drv", "tcp_inet", "inet_gethost", "zlib_drv", "js"]
        );
    }

    #[test]
    fn test_builtin_init_succeeds() {
        for driver in builtin_drivers() {
            assert!(driver.init().is_ok());
        }
    }
}
