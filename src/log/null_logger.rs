/*!

A "logger" used when the `logging` feature is off. It outputs nothing but keeps the public API
and the global maximum level consistent.

*/

use crate::log::LogConfiguration;

impl LogConfiguration {
    /// Sets the global logger to conform to this `LogConfiguration`.
    pub(in crate::log) fn set_config(&mut self) {
        let module_max = self
            .module_configurations
            .values()
            .map(|module_config| module_config.level)
            .max()
            .unwrap_or(log::LevelFilter::Off);
        log::set_max_level(self.global_log_level.max(module_max));
    }
}
