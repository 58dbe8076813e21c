use repo_tidy::openapi::{OpenApiFixer, OpenApiRunner};
use repo_tidy::RulesConfig;
use tempfile::TempDir;

const PETS: &str = "\
openapi: 3.0.3
info:
  title: Pets
  version: '1'
paths:
  /pets:
    get:
      responses:
        '200':
          description: OK
  /pets/{petId}:
    delete:
      responses:
        '204':
          description: Deleted
components:
  schemas:
    Pet:
      type: object
";

#[test]
fn fixes_documents_across_a_tree() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let api_dir = temp_dir.path().join("src/main/resources/api");
    std::fs::create_dir_all(&api_dir)?;
    std::fs::write(api_dir.join("pets.yaml"), PETS)?;
    std::fs::write(api_dir.join("legacy.yml"), PETS)?;

    let vendored = temp_dir.path().join("node_modules/spec");
    std::fs::create_dir_all(&vendored)?;
    std::fs::write(vendored.join("pets.yaml"), PETS)?;

    let rules = RulesConfig::from_toml_str("[openapi]\nextensions = [\"yaml\"]\n")?;
    let runner = OpenApiRunner::new(OpenApiFixer::new(false, false), rules.openapi.extensions);
    let report = runner.run(temp_dir.path())?;

    assert_eq!(report.files_scanned, 1);
    assert_eq!(report.files_changed, 1);
    assert_eq!(report.titles_added, 1);
    assert_eq!(report.operation_ids_added, 2);

    let fixed = std::fs::read_to_string(api_dir.join("pets.yaml"))?;
    assert!(fixed.contains("    get:\n      operationId: getPets\n"));
    assert!(fixed.contains("    delete:\n      operationId: deletePetsByPetId\n"));
    assert!(fixed.contains("    Pet:\n      title: Pet\n"));

    let document: serde_yaml::Value = serde_yaml::from_str(&fixed)?;
    assert_eq!(
        document["paths"]["/pets"]["get"]["operationId"],
        serde_yaml::Value::from("getPets")
    );

    assert_eq!(std::fs::read_to_string(api_dir.join("legacy.yml"))?, PETS);
    assert_eq!(std::fs::read_to_string(vendored.join("pets.yaml"))?, PETS);
    Ok(())
}

#[test]
fn operation_ids_only_leaves_schemas_alone() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let file = temp_dir.path().join("pets.yaml");
    std::fs::write(&file, PETS)?;

    let runner = OpenApiRunner::new(OpenApiFixer::new(false, true), vec!["yaml".to_string()]);
    let report = runner.run(&file)?;

    assert_eq!(report.titles_added, 0);
    assert_eq!(report.operation_ids_added, 2);
    assert!(!std::fs::read_to_string(&file)?.contains("title: Pet\n"));
    Ok(())
}
