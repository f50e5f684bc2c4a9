//! testgen/synth.rs
//!
//! Canned test-method bodies per unit kind. Output is plain text; nothing is
//! compiled or executed, so the generated assertions are starting points.

use crate::detectors::{SourceUnit, UnitKind};
use crate::testgen::naming::{kebab_case, snake_case, studly_case};

const INDENT: &str = "    ";

/// Body for the `{{METHODS}}` placeholder.
pub fn synthesize(kind: UnitKind, class: &str, unit: &SourceUnit) -> String {
    let methods = match kind {
        UnitKind::Model => model_methods(class, unit),
        UnitKind::Controller => controller_methods(unit),
        UnitKind::Service | UnitKind::Plain => unit_methods(class, unit),
    };

    methods.join("\n\n")
}

/// One `/** @test */` method, body lines indented one level deeper.
pub fn test_method(name: &str, lines: &[String]) -> String {
    let mut out = String::new();
    out.push_str(&format!("{INDENT}/** @test */\n"));
    out.push_str(&format!("{INDENT}public function {name}()\n"));
    out.push_str(&format!("{INDENT}{{\n"));

    for line in lines {
        if line.is_empty() {
            out.push('\n');
        } else {
            out.push_str(&format!("{INDENT}{INDENT}{line}\n"));
        }
    }

    out.push_str(&format!("{INDENT}}}"));
    out
}

/* ============================================================
   Plain / Service
   ============================================================ */

fn unit_methods(class: &str, unit: &SourceUnit) -> Vec<String> {
    let mut out = vec![test_method(
        "it_can_be_instantiated",
        &[
            format!("$instance = new {class}();"),
            "$this->assertNotNull($instance);".into(),
        ],
    )];

    for method in unit.testable_methods() {
        out.push(test_method(
            &format!("it_can_call_{}", snake_case(method)),
            &[
                format!("$instance = new {class}();"),
                format!("// Add test logic for {method} method"),
                "$this->assertTrue(true);".into(),
            ],
        ));
    }

    out
}

/* ============================================================
   Model
   ============================================================ */

fn model_methods(class: &str, unit: &SourceUnit) -> Vec<String> {
    let mut out = vec![
        test_method(
            "it_can_create_a_model",
            &[
                format!("$model = {class}::factory()->create();"),
                "$this->assertNotNull($model);".into(),
            ],
        ),
        test_method(
            "it_can_update_a_model",
            &[
                format!("$model = {class}::factory()->create();"),
                "$originalValue = $model->name;".into(),
                "$model->name = 'Updated Name';".into(),
                "$model->save();".into(),
                String::new(),
                "$this->assertNotEquals($originalValue, $model->fresh()->name);".into(),
            ],
        ),
        test_method(
            "it_can_delete_a_model",
            &[
                format!("$model = {class}::factory()->create();"),
                "$modelId = $model->id;".into(),
                String::new(),
                "$model->delete();".into(),
                String::new(),
                format!("$this->assertNull({class}::find($modelId));"),
            ],
        ),
    ];

    for method in unit.public_methods.iter().filter(|m| is_relationship(m)) {
        out.push(relationship_method(class, method));
    }

    for method in unit.public_methods.iter().filter(|m| is_accessor(m)) {
        out.push(accessor_method(class, method));
    }

    out
}

fn is_relationship(method: &str) -> bool {
    method.starts_with("has") || method.starts_with("belongsTo")
}

fn is_accessor(method: &str) -> bool {
    method.starts_with("get") && method.ends_with("Attribute")
}

/// `hasPosts` → `Posts`. Every occurrence of either prefix word is removed.
pub fn related_model(method: &str) -> String {
    studly_case(&method.replace("has", "").replace("belongsTo", ""))
}

/// `getFullNameAttribute` → `full_name`.
pub fn accessor_attribute(method: &str) -> String {
    let without_get = method.replacen("get", "", 1);
    let stripped = match without_get.rfind("Attribute") {
        Some(idx) => format!(
            "{}{}",
            &without_get[..idx],
            &without_get[idx + "Attribute".len()..]
        ),
        None => without_get,
    };
    snake_case(&stripped)
}

fn relationship_method(class: &str, method: &str) -> String {
    let related = related_model(method);

    test_method(
        &format!("it_{}", snake_case(method)),
        &[
            format!("$model = {class}::factory()->create();"),
            format!("$related = {related}::factory()->create(['user_id' => $model->id]);"),
            String::new(),
            format!("$this->assertTrue($model->{method}->contains($related));"),
        ],
    )
}

fn accessor_method(class: &str, method: &str) -> String {
    let attribute = accessor_attribute(method);

    test_method(
        &format!("it_can_get_{attribute}_attribute"),
        &[
            format!("$model = {class}::factory()->create(["),
            "    'first_name' => 'John',".into(),
            "    'last_name' => 'Doe'".into(),
            "]);".into(),
            String::new(),
            format!("$this->assertEquals('John Doe', $model->{attribute});"),
        ],
    )
}

/* ============================================================
   Controller
   ============================================================ */

fn controller_methods(unit: &SourceUnit) -> Vec<String> {
    unit.testable_methods()
        .map(|method| {
            test_method(
                &format!("it_can_{}", snake_case(method)),
                &[
                    format!("$response = $this->getJson('/{}');", kebab_case(method)),
                    String::new(),
                    "$response->assertStatus(200);".into(),
                ],
            )
        })
        .collect()
}
