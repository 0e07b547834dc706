#![no_main]
use libfuzzer_sys::fuzz_target;
use millgen_core::{InputVar, VarTable};

fuzz_target!(|data: &[u8]| {
    let Ok(sheet) = millgen_config::parse_sheet_csv("inputs", data) else {
        return;
    };
    if let Ok(table) = VarTable::<InputVar>::try_from(&sheet) {
        for v in table.iter() {
            let _ = v.mid();
        }
    }
});
