/// Standalone Leaflet document for one composed view.
pub const MAP_HTML: &str = r#"<!DOCTYPE html>
<html lang="fr">
<head>
  <meta charset="UTF-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1.0" />
  <title>Carte</title>

  <!-- Leaflet 1.9.4 -->
  <link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css"
    integrity="sha256-p4NxAoJBhIIN+hmNHrzRCf9tD/miZyoHS5obTRR9BMY=" crossorigin="" />
  <script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"
    integrity="sha256-20nQCchB9co0qIjJZRGuk2/Z9VM+kNiyxNV1lvTlZBo=" crossorigin=""></script>

  <!-- Leaflet.markercluster 1.4.1 -->
  <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.4.1/dist/MarkerCluster.css" />
  <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@1.4.1/dist/MarkerCluster.Default.css" />
  <script src="https://unpkg.com/leaflet.markercluster@1.4.1/dist/leaflet.markercluster.js"></script>
  {{FULLSCREEN_HEAD}}

  <style>
    html, body { height: 100%; margin: 0; padding: 0; background: {{BACKGROUND}}; }
    #map { position: absolute; top: 0; bottom: 0; left: 0; right: 0; }
    .leaflet-container { background: {{BACKGROUND}}; }

    #legend {
      position: fixed;
      bottom: 50px;
      left: 50px;
      width: 150px;
      height: auto;
      z-index: 9999;
      font-size: 14px;
      background-color: white;
      opacity: 0.8;
      padding: 10px;
    }
    #legend h4 { margin: 0 0 8px 0; }
    #legend ul { list-style: none; padding: 0; margin: 0; }
    #legend li { margin-bottom: 5px; }
    #legend .swatch {
      display: inline-block;
      width: 12px;
      height: 12px;
      margin-right: 5px;
      border-radius: 50%;
    }

    #title {
      position: fixed;
      top: 10px;
      left: 50%;
      transform: translateX(-50%);
      z-index: 9999;
      font-size: 24px;
      font-weight: bold;
      background-color: white;
      opacity: 0.9;
      padding: 6px 16px;
      border-radius: 4px;
    }

    .place-label { text-align: center; }
    .place-label .dot {
      display: inline-block;
      width: 20px;
      height: 20px;
      border-radius: 50%;
    }
    .place-label .label {
      font-size: {{FONT_SIZE}}px;
      white-space: nowrap;
    }
  </style>
</head>
<body>
  <div id="map"></div>
  {{TITLE}}
  {{LEGEND}}

  <script>
    const map = L.map('map', { zoomControl: true, preferCanvas: true });
    {{TILE_LAYER}}
    {{FULLSCREEN_CONTROL}}

    const clustered = {{CLUSTERED}};
    const group = clustered ? L.markerClusterGroup() : L.featureGroup();
    group.addTo(map);

    const entities = { '&': '&amp;', '<': '&lt;', '>': '&gt;', '"': '&quot;', "'": '&#39;' };
    const esc = (s) => String(s).replace(/[&<>"']/g, (c) => entities[c]);

    const markers = {{MARKERS}};
    for (const m of markers) {
      if (m.style === 'labelled') {
        const html = '<div class="dot" style="background:' + m.color + ';"></div>'
          + '<div class="label" style="color:' + m.color + ';">' + esc(m.name) + '</div>';
        L.marker([m.lat, m.lon], {
          icon: L.divIcon({ className: 'place-label', html: html, iconSize: [160, 40], iconAnchor: [80, 10] })
        }).addTo(group);
      } else {
        L.circleMarker([m.lat, m.lon], {
          radius: {{DOT_RADIUS}},
          color: m.color,
          fill: true,
          fillColor: m.color,
          fillOpacity: 1
        }).addTo(group);
      }
    }

    {{EXTENT}}
  </script>
</body>
</html>
"#;
