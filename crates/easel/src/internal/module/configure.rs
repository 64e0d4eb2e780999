use wasmtime::Config;

/// Engine settings for core-module guests. Backtraces stay on so a trapping
/// entry point reports the guest frames it failed in.
pub fn configure_engine(cfg: &mut Config) {
    cfg.table_lazy_init(false);
    cfg.generate_address_map(false);
    cfg.wasm_backtrace(true);
    cfg.native_unwind_info(false);
    cfg.cranelift_opt_level(wasmtime::OptLevel::Speed);
}
