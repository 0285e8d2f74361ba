//! WGSL compute shaders

use crate::workload::{LaneSeed, RecurrenceFloat};

/// Threads per workgroup in the FLOPS shader.
pub const WORKGROUP_SIZE: u32 = 256;

const FLOPS_SHADER_TEMPLATE: &str = r#"
struct Params {
    work_items: u32,
    ops_per_item: u32,
    _pad0: u32,
    _pad1: u32,
}

@group(0) @binding(0) var<storage, read_write> results: array<f32>;
@group(0) @binding(1) var<uniform> params: Params;

@compute @workgroup_size({workgroup_size})
fn main(@builtin(global_invocation_id) global_id: vec3<u32>) {
    let gid = global_id.x;
    if (gid >= params.work_items) {
        return;
    }

    var a: f32 = {a0} + f32(gid) * {increment};
    var b: f32 = {b0} + f32(gid) * {increment};
    var result: f32 = 0.0;

    for (var i: u32 = 0u; i < params.ops_per_item; i = i + 1u) {
        result = fma(a, b, result);
        a = result * {decay};
        b = a + {bump};
    }

    results[gid] = result;
}
"#;

/// The multiply-add recurrence in f32, one lane per invocation.
///
/// Seeds come from [`LaneSeed::GPU`] and the decay/bump constants from the
/// f32 [`RecurrenceFloat`] impl, so invocation `gid` computes exactly what
/// `LaneSeed::GPU.lane(gid).run_fused(n)` computes on the CPU.
pub fn flops_shader() -> String {
    let seed = LaneSeed::GPU;
    // `{:?}` keeps a decimal point, which WGSL needs for an f32 literal
    FLOPS_SHADER_TEMPLATE
        .replace("{workgroup_size}", &WORKGROUP_SIZE.to_string())
        .replace("{a0}", &format!("{:?}", seed.a0))
        .replace("{b0}", &format!("{:?}", seed.b0))
        .replace("{increment}", &format!("{:?}", seed.increment))
        .replace("{decay}", &format!("{:?}", <f32 as RecurrenceFloat>::DECAY))
        .replace("{bump}", &format!("{:?}", <f32 as RecurrenceFloat>::BUMP))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_uses_shared_constants() {
        let shader = flops_shader();
        for placeholder in ["{a0}", "{b0}", "{increment}", "{decay}", "{bump}", "{workgroup_size}"] {
            assert!(!shader.contains(placeholder), "{placeholder} left in shader");
        }
        assert!(shader.contains("@workgroup_size(256)"));
        assert!(shader.contains(&format!("{:?} + f32(gid)", LaneSeed::GPU.a0)));
        assert!(shader.contains(&format!("result * {:?}", <f32 as RecurrenceFloat>::DECAY)));
        assert!(shader.contains("a + 1.000001"));
    }
}
