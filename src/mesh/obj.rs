//! Wavefront OBJ text output.

/// Unit cube returned whenever a real body mesh can't be produced.
pub const CUBE_OBJ: &str = "# simple cube
o Cube
v -0.5 -0.5 -0.5
v  0.5 -0.5 -0.5
v  0.5  0.5 -0.5
v -0.5  0.5 -0.5
v -0.5 -0.5  0.5
v  0.5 -0.5  0.5
v  0.5  0.5  0.5
v -0.5  0.5  0.5
f 1 2 3 4
f 5 6 7 8
f 1 5 8 4
f 2 6 7 3
f 4 3 7 8
f 1 2 6 5";

/// Writes triangles with 0-based `faces` converted to OBJ's 1-based indices.
pub fn to_obj(vertices: &[[f32; 3]], faces: &[[u32; 3]]) -> String {
    let mut lines = Vec::with_capacity(vertices.len() + faces.len() + 2);
    lines.push("# SMPL mesh".to_string());
    lines.push("o SMPL".to_string());
    for [x, y, z] in vertices {
        lines.push(format!("v {x:.6} {y:.6} {z:.6}"));
    }
    for [a, b, c] in faces {
        lines.push(format!("f {} {} {}", a + 1, b + 1, c + 1));
    }
    lines.join("\n")
}
