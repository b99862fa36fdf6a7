use axum::response::Html;

/// Landing form. Navigation happens client-side to `/wheel/{input}` with the
/// raw input URL-encoded; the upstream service rejects malformed identifiers.
pub async fn landing() -> Html<&'static str> {
    Html(LANDING_HTML)
}

/// Wheel view. Reads the account id back out of its own path, fetches the
/// aggregated wishlist, and drives the wheel through the /api/wheel routes.
pub async fn wheel() -> Html<&'static str> {
    Html(WHEEL_HTML)
}

const LANDING_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Steam Wishlist Wheel</title>
<style>
  body { font-family: sans-serif; background: #14202e; color: #eee;
         display: flex; justify-content: center; margin-top: 10rem; }
  form { display: flex; flex-direction: column; gap: .75rem; width: 24rem; }
  input, button { padding: .5rem; font-size: 1rem; }
</style>
</head>
<body>
<form id="search">
  <h1>Steam Wishlist Wheel</h1>
  <p>Enter a Steam ID or profile URL to spin a wheel of the wishlist games.</p>
  <label for="steamRef">Steam ID or Profile URL</label>
  <input id="steamRef" name="steamRef"
         placeholder="76561198209138859 or https://steamcommunity.com/id/username">
  <button id="go" type="submit">Create Wheel</button>
</form>
<script>
document.getElementById('search').addEventListener('submit', (e) => {
  e.preventDefault();
  const value = document.getElementById('steamRef').value.trim();
  if (!value) return;
  document.getElementById('go').disabled = true;
  window.location.href = '/wheel/' + encodeURIComponent(value);
});
</script>
</body>
</html>
"#;

const WHEEL_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Steam Wishlist Wheel</title>
<style>
  body { font-family: sans-serif; background: #14202e; color: #eee; text-align: center; }
  #wheel { width: 320px; height: 320px; border-radius: 50%; margin: 1rem auto;
           border: 4px solid #fff; }
  #wheel.spinning { transition: transform 3s cubic-bezier(0.23, 1, 0.32, 1); }
  #error { color: #f66; }
  button { padding: .5rem 1.5rem; font-size: 1rem; margin: .25rem; }
  ul { list-style: none; }
</style>
</head>
<body>
<h1 id="status">Loading...</h1>
<p id="error" hidden></p>
<div id="wheel" hidden></div>
<div>
  <button id="spin" hidden>Spin the Wheel!</button>
  <button id="reset" hidden>Reset</button>
</div>
<h2 id="selected"></h2>
<hr>
<ul id="list"></ul>
<script>
const steamId = decodeURIComponent(location.pathname.split('/').pop());
const api = '/api/wheel/' + encodeURIComponent(steamId);
const colors = ['#4e79a7','#f28e2b','#e15759','#76b7b2','#59a14f',
                '#edc948','#b07aa1','#ff9da7','#9c755f','#bab0ac'];
let items = [];
let poll = null;

function paintWheel() {
  const total = items.reduce((sum, i) => sum + i.priority, 0);
  let angle = 0;
  const stops = items.map((item, idx) => {
    const start = angle;
    angle += item.priority / total * 360;
    return colors[idx % colors.length] + ' ' + start + 'deg ' + angle + 'deg';
  });
  const wheel = document.getElementById('wheel');
  wheel.style.background = 'conic-gradient(' + stops.join(',') + ')';
  wheel.hidden = false;
}

async function load() {
  const res = await fetch('/api/wishlist/' + encodeURIComponent(steamId));
  if (!res.ok) {
    const body = await res.json().catch(() => ({ error: 'request failed' }));
    document.getElementById('status').textContent = 'Could not load wishlist';
    const err = document.getElementById('error');
    err.textContent = body.error;
    err.hidden = false;
    return;
  }
  const wishlist = (await res.json()).sort((a, b) => a.priority - b.priority);
  items = wishlist.slice(0, 10);
  document.getElementById('status').textContent = 'Wishlist wheel for ' + steamId;
  document.getElementById('list').innerHTML = wishlist
    .map(i => '<li>' + i.name + ' | ' + i.priority + '</li>').join('');
  paintWheel();
  document.getElementById('spin').hidden = false;
  document.getElementById('reset').hidden = false;
}

async function refresh() {
  const state = await (await fetch(api)).json();
  const wheel = document.getElementById('wheel');
  wheel.classList.toggle('spinning', state.spinning);
  wheel.style.transform = 'rotate(' + state.rotation + 'deg)';
  document.getElementById('selected').textContent =
    state.selected ? state.selected.name : '';
  document.getElementById('spin').disabled = state.spinning;
  if (!state.spinning && poll) { clearInterval(poll); poll = null; }
}

document.getElementById('spin').addEventListener('click', async () => {
  const res = await fetch(api + '/spin', {
    method: 'POST',
    headers: { 'content-type': 'application/json' },
    body: JSON.stringify({ items })
  });
  if (res.ok && !poll) poll = setInterval(refresh, 250);
  refresh();
});

document.getElementById('reset').addEventListener('click', async () => {
  await fetch(api + '/reset', { method: 'POST' });
  refresh();
});

load();
</script>
</body>
</html>
"#;
