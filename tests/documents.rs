mod support;

use pinboard::document::DocumentLoader;

use support::TestWorkspace;

#[test]
fn lists_every_category_newest_first() {
    let ws = TestWorkspace::new();
    ws.write_doc("journal/2026-03-01", "# March first\n\nQuiet day.", 300);
    ws.write_doc("projects/pinboard", "# Pinboard\n\nBoard and docs.", 100);
    ws.write_doc("projects/garden", "Beds and compost.", 200);

    let loader = DocumentLoader::new(ws.docs_root());
    let docs = loader.list_all().unwrap();
    let slugs: Vec<&str> = docs.iter().map(|d| d.slug.as_str()).collect();
    assert_eq!(
        slugs,
        ["projects/pinboard", "projects/garden", "journal/2026-03-01"]
    );
    assert_eq!(docs[1].title, "garden");
    assert_eq!(docs[1].excerpt, "Beds and compost.");
    assert!(docs[0].updated_at > docs[2].updated_at);
    assert_eq!(loader.categories().unwrap(), ["journal", "projects"]);
}

#[test]
fn nested_and_non_markdown_files_are_ignored() {
    let ws = TestWorkspace::new();
    ws.write_doc("notes/kept", "# Kept\n", 0);
    ws.write_file("documents/notes/deeper/hidden.md", "# Hidden\n");
    ws.write_file("documents/notes/image.png", "binary");
    ws.write_file("documents/loose.md", "# Loose\n");

    let loader = DocumentLoader::new(ws.docs_root());
    let docs = loader.list_all().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].slug, "notes/kept");
    assert!(loader.get("notes/deeper").unwrap().is_none());
    assert!(loader.get("loose").unwrap().is_none());
}

#[test]
fn get_returns_full_document() {
    let ws = TestWorkspace::new();
    let content = "# Weekly review\n\nWins:\n- shipped\n\nNext week.";
    ws.write_doc("journal/week-10", content, 0);

    let doc = DocumentLoader::new(ws.docs_root())
        .get("journal/week-10")
        .unwrap()
        .expect("document exists");
    assert_eq!(doc.title, "Weekly review");
    assert_eq!(doc.category, "journal");
    assert_eq!(doc.content, content);
    assert_eq!(doc.excerpt, "Wins:\n- shipped");
    assert_eq!(doc.meta().slug, "journal/week-10");
}

#[test]
fn changes_on_disk_show_up_without_reload() {
    let ws = TestWorkspace::new();
    let loader = DocumentLoader::new(ws.docs_root());
    assert!(loader.list_all().unwrap().is_empty());

    ws.write_doc("inbox/first", "# First\n", 0);
    assert_eq!(loader.list_all().unwrap().len(), 1);

    ws.write_doc("inbox/first", "# Renamed\n", 0);
    assert_eq!(loader.get("inbox/first").unwrap().unwrap().title, "Renamed");
}

#[cfg(unix)]
#[test]
fn symlinked_categories_and_files_are_listed() {
    use std::os::unix::fs::symlink;

    let ws = TestWorkspace::new();
    ws.write_file("shared/recipes/bread.md", "# Bread\n\nFlour, water.");
    ws.write_file("shared/loose/soup.md", "# Soup\n");
    ws.write_doc("kitchen/pasta", "# Pasta\n", 0);
    symlink(ws.path().join("shared/recipes"), ws.docs_root().join("recipes")).unwrap();
    symlink(
        ws.path().join("shared/loose/soup.md"),
        ws.docs_root().join("kitchen/soup.md"),
    )
    .unwrap();
    symlink(
        ws.path().join("shared/missing.md"),
        ws.docs_root().join("kitchen/dangling.md"),
    )
    .unwrap();

    let loader = DocumentLoader::new(ws.docs_root());
    let mut slugs: Vec<String> = loader
        .list_all()
        .unwrap()
        .into_iter()
        .map(|doc| doc.slug)
        .collect();
    slugs.sort();
    assert_eq!(slugs, ["kitchen/pasta", "kitchen/soup", "recipes/bread"]);
    assert_eq!(loader.categories().unwrap(), ["kitchen", "recipes"]);
    assert_eq!(loader.get("recipes/bread").unwrap().unwrap().title, "Bread");
}
