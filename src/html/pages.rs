use super::{escape, fill_template};
use crate::view::{TileSource, ViewOptions, FONT_SIZES};

const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="fr">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Visualisation personnalisée sur la Carte de France</title>
  <style>
    body { font-family: system-ui, sans-serif; margin: 0; display: flex; min-height: 100vh; color: #262730; }
    aside { width: 280px; background: #f0f2f6; padding: 24px; box-sizing: border-box; }
    main { flex: 1; padding: 24px 48px; }
    h1 { margin-top: 0; }
    label { display: block; margin: 10px 0 4px; }
    fieldset { border: 1px solid #ddd; border-radius: 6px; margin: 16px 0; }
    .error { background: #ffe3e3; color: #a61b1b; padding: 12px; border-radius: 6px; }
    .info { background: #e3f0ff; color: #1b4fa6; padding: 12px; border-radius: 6px; }
    .downloads { display: flex; gap: 24px; margin-top: 16px; }
    iframe { border: 1px solid #ddd; }
  </style>
</head>
<body>
  {{SIDEBAR}}
  <main>
    <h1>Visualisation personnalisée sur la Carte de France</h1>
    {{CONTENT}}
  </main>
</body>
</html>
"#;

const UPLOAD_FORM_HTML: &str = r#"
    {{MESSAGE}}
    <form action="/upload" method="post" enctype="multipart/form-data">
      <label for="file">Choisissez un fichier CSV</label>
      <input type="file" id="file" name="file" accept=".csv,text/csv" required />
      <button type="submit">Envoyer</button>
    </form>
"#;

pub fn upload_page(error: Option<&str>) -> String {
    let message = error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape(e)))
        .unwrap_or_default();
    let content = fill_template(UPLOAD_FORM_HTML, &[("MESSAGE", message.as_str())]);
    fill_template(LAYOUT_HTML, &[("SIDEBAR", ""), ("CONTENT", content.as_str())])
}

/// What the map page needs besides the view options.
pub struct MapPage<'a> {
    pub options: &'a ViewOptions,
    pub categories: &'a [String],
    pub rows: usize,
    pub dropped: usize,
    /// `data:text/html;base64,...` link of the exported document.
    pub html_download: &'a str,
}

const MAP_PAGE_HTML: &str = r#"
    {{NOTICE}}
    <form id="view" action="/map" method="get">
      <input type="hidden" name="filtered" value="1" />
      <fieldset>
        <legend>Sélectionnez les catégories à afficher sur la carte</legend>
        {{CATEGORIES}}
      </fieldset>
      <button type="submit">Mettre à jour la carte</button>
    </form>
    <p><a href="/">Charger un autre fichier</a></p>
    <iframe src="/map/view?{{QUERY}}" width="900" height="700" title="Carte"></iframe>
    <div class="downloads">
      <a href="/export/png?{{QUERY}}">Télécharger la carte en PNG</a>
      <a href="{{HTML_DOWNLOAD}}" download="carte.html">Cliquez ici pour télécharger la carte en HTML</a>
      <a href="/export/csv">Télécharger le CSV géocodé</a>
    </div>
"#;

const SIDEBAR_HTML: &str = r#"
  <aside>
    <h2>Options de la carte</h2>
    <label for="tile">Choisissez le fond de carte</label>
    <select id="tile" name="tile" form="view">{{TILE_OPTIONS}}</select>

    <label><input type="checkbox" name="force_points" form="view" {{FORCE_POINTS}} />
      Forcer la vue des points (désactiver le regroupement)</label>
    <label><input type="checkbox" name="labels" form="view" {{LABELS}} />
      Afficher le nom du lieu sous le point</label>

    <label for="font_size">Taille de police des noms</label>
    <select id="font_size" name="font_size" form="view">{{FONT_OPTIONS}}</select>

    <label><input type="checkbox" name="fullscreen" form="view" {{FULLSCREEN}} />
      Bouton plein écran</label>

    <label for="title">Titre de la carte</label>
    <input type="text" id="title" name="title" form="view" value="{{TITLE}}" />
  </aside>
"#;

pub fn map_page(page: &MapPage<'_>) -> String {
    let options = page.options;

    let tile_options: String = TileSource::ALL.iter()
        .map(|t| format!(
            r#"<option value="{}"{}>{}</option>"#,
            t.key(),
            selected(*t == options.tile),
            escape(t.label()),
        ))
        .collect();

    let font_options: String = FONT_SIZES.iter()
        .map(|size| format!(
            r#"<option value="{size}"{}>{size}px</option>"#,
            selected(*size == options.font_size),
        ))
        .collect();

    let sidebar = fill_template(SIDEBAR_HTML, &[
        ("TILE_OPTIONS", tile_options.as_str()),
        ("FORCE_POINTS", checked(options.force_points)),
        ("LABELS", checked(options.labels)),
        ("FONT_OPTIONS", font_options.as_str()),
        ("FULLSCREEN", checked(options.fullscreen)),
        ("TITLE", escape(&options.title).as_str()),
    ]);

    let categories: String = page.categories.iter()
        .map(|c| format!(
            r#"<label><input type="checkbox" name="category" value="{0}" {1} /> {0}</label>"#,
            escape(c),
            checked(options.is_selected(c)),
        ))
        .collect();

    let notice = if page.dropped > 0 {
        format!(
            r#"<p class="info">{} lieux placés, {} adresses non géocodées ignorées.</p>"#,
            page.rows, page.dropped,
        )
    } else {
        format!(r#"<p class="info">{} lieux placés.</p>"#, page.rows)
    };

    let query = escape(&options.to_query());
    let content = fill_template(MAP_PAGE_HTML, &[
        ("NOTICE", notice.as_str()),
        ("CATEGORIES", categories.as_str()),
        ("QUERY", query.as_str()),
        ("HTML_DOWNLOAD", page.html_download),
    ]);

    fill_template(LAYOUT_HTML, &[("SIDEBAR", sidebar.as_str()), ("CONTENT", content.as_str())])
}

fn selected(yes: bool) -> &'static str {
    if yes { " selected" } else { "" }
}

fn checked(yes: bool) -> &'static str {
    if yes { "checked" } else { "" }
}
